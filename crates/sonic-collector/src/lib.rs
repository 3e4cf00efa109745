pub mod cache;
pub mod coerce;
pub mod collectors;
pub mod labels;
pub mod metrics;
pub mod orchestrator;
pub mod scanner;

pub use cache::{CachedCollector, DEFAULT_CACHE_TTL};
pub use collectors::{CrmScraper, HwScraper, InterfaceScraper};
pub use metrics::{Collector, CollectorRegistry, MetricDescriptor, MetricSample, MetricType};
pub use orchestrator::{DomainScraper, ScrapeResult};
