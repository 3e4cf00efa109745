pub mod assembler;
pub mod registry;
pub mod types;

pub use registry::{Collector, CollectorRegistry};
pub use types::{MetricDescriptor, MetricSample, MetricType};
