pub mod client;
pub mod config;
pub mod database;
#[cfg(any(test, feature = "test-util"))]
pub mod glob;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod store;

pub use client::{RedisConnector, RedisStore};
pub use config::{Network, RedisConfig};
pub use database::Database;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemorySession, MemoryStore};
pub use store::{KeyValueStore, StoreConnector};
