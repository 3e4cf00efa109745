use std::collections::HashMap;

use async_trait::async_trait;
use sonic_common::error::Result;

use crate::database::Database;

/// Read-only access to the two primitives the exporter needs from each
/// logical database.
#[async_trait]
pub trait KeyValueStore: Send {
    /// Lists keys matching a Redis glob pattern.
    async fn keys(&mut self, database: Database, pattern: &str) -> Result<Vec<String>>;

    /// Fetches the full field mapping of a hash. A missing key yields an
    /// empty map.
    async fn hgetall(&mut self, database: Database, key: &str) -> Result<HashMap<String, String>>;
}

/// Opens a store connection scoped to one scrape. Dropping the returned
/// store releases every underlying connection.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn KeyValueStore>>;
}
