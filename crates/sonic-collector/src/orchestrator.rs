use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sonic_common::error::{ExporterError, Result};
use sonic_redis::{KeyValueStore, StoreConnector};
use tokio::time::Instant;
use tracing::info;

use crate::metrics::{
    assembler::constant,
    types::{MetricDescriptor, MetricSample},
};

/// The domain-specific half of a scrape: which keys to read and which
/// samples to build from them.
#[async_trait]
pub trait DomainScraper: Send + Sync {
    /// Metric subsystem, e.g. `hw` in `sonic_hw_fan_rpm`.
    fn subsystem(&self) -> &'static str;

    fn descriptors(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Runs every sub-collection against an open store. Any error aborts the
    /// whole scrape.
    async fn scrape(&self, store: &mut dyn KeyValueStore) -> Result<Vec<MetricSample>>;
}

#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// Domain samples in append order, with the duration sample last.
    pub samples: Vec<MetricSample>,
    pub duration: Duration,
}

pub struct ScrapeOrchestrator<D> {
    scraper: D,
    connector: Arc<dyn StoreConnector>,
    scrape_duration: Arc<MetricDescriptor>,
}

impl<D: DomainScraper> ScrapeOrchestrator<D> {
    pub fn new(scraper: D, connector: Arc<dyn StoreConnector>) -> Self {
        let subsystem = scraper.subsystem();
        let scrape_duration = MetricDescriptor::gauge(
            subsystem,
            "scrape_duration_seconds",
            &format!("Time it took for prometheus to scrape sonic {subsystem} metrics"),
            &[],
        );

        Self {
            scraper,
            connector,
            scrape_duration,
        }
    }

    pub fn subsystem(&self) -> &'static str {
        self.scraper.subsystem()
    }

    pub fn descriptors(&self) -> Vec<Arc<MetricDescriptor>> {
        let mut descriptors = self.scraper.descriptors();
        descriptors.push(Arc::clone(&self.scrape_duration));
        descriptors
    }

    pub async fn scrape(&self) -> Result<ScrapeResult> {
        let domain = self.scraper.subsystem();
        info!(domain, "starting metric scrape");
        let started_at = Instant::now();

        let mut samples = {
            let mut store = self
                .connector
                .connect()
                .await
                .map_err(|err| ExporterError::collection(domain, "connect", err))?;
            self.scraper.scrape(store.as_mut()).await?
        };

        let duration = started_at.elapsed();
        samples.push(constant(&self.scrape_duration, duration.as_secs_f64(), &[])?);
        info!(
            domain,
            samples = samples.len(),
            elapsed_ms = duration.as_millis() as u64,
            "finished metric scrape"
        );

        Ok(ScrapeResult { samples, duration })
    }
}
