use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sonic_redis::StoreConnector;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, error, warn};

use crate::{
    metrics::{
        assembler::constant,
        registry::Collector,
        types::{MetricDescriptor, MetricSample},
    },
    orchestrator::{DomainScraper, ScrapeOrchestrator},
};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15);

#[derive(Default)]
struct CacheEntry {
    samples: Vec<MetricSample>,
    captured_at: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.captured_at
            .is_some_and(|captured_at| captured_at.elapsed() < ttl)
    }
}

/// Serves a domain's samples from memory for `ttl` after each successful
/// scrape.
///
/// The lock is held for the whole of [`CachedCollector::collect`], including
/// any scrape it triggers, so callers queue behind an in-flight scrape and
/// then read its result instead of starting another one. A failed scrape
/// leaves the previous samples and timestamp in place; the caller gets those
/// samples with `collector_success` set to 0 and the next call tries again.
pub struct CachedCollector<D> {
    orchestrator: ScrapeOrchestrator<D>,
    collector_success: Arc<MetricDescriptor>,
    ttl: Duration,
    cache: Mutex<CacheEntry>,
}

impl<D: DomainScraper> CachedCollector<D> {
    pub fn new(scraper: D, connector: Arc<dyn StoreConnector>) -> Self {
        let subsystem = scraper.subsystem();
        let collector_success = MetricDescriptor::gauge(
            subsystem,
            "collector_success",
            &format!("Whether {subsystem} collector succeeded"),
            &[],
        );

        Self {
            orchestrator: ScrapeOrchestrator::new(scraper, connector),
            collector_success,
            ttl: DEFAULT_CACHE_TTL,
            cache: Mutex::new(CacheEntry::default()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn collect_samples(&self) -> Vec<MetricSample> {
        let domain = self.orchestrator.subsystem();
        let mut cache = self.cache.lock().await;

        let success = if cache.is_fresh(self.ttl) {
            debug!(domain, "returning metrics from cache");
            true
        } else {
            match self.orchestrator.scrape().await {
                Ok(result) => {
                    *cache = CacheEntry {
                        samples: result.samples,
                        captured_at: Some(Instant::now()),
                    };
                    true
                }
                Err(err) => {
                    error!(
                        domain,
                        kind = err.kind(),
                        error = %err,
                        cached = cache.samples.len(),
                        "scrape failed, returning metrics from cache"
                    );
                    false
                }
            }
        };

        let mut samples = Vec::with_capacity(cache.samples.len() + 1);
        samples.extend(cache.samples.iter().cloned());
        match constant(&self.collector_success, if success { 1.0 } else { 0.0 }, &[]) {
            Ok(sample) => samples.push(sample),
            Err(err) => warn!(domain, error = %err, "failed to build success sample"),
        }
        samples
    }
}

#[async_trait]
impl<D: DomainScraper> Collector for CachedCollector<D> {
    fn name(&self) -> &str {
        self.orchestrator.subsystem()
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        let mut descriptors = self.orchestrator.descriptors();
        descriptors.push(Arc::clone(&self.collector_success));
        descriptors
    }

    async fn collect(&self) -> Vec<MetricSample> {
        self.collect_samples().await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use futures::future::join_all;
    use sonic_redis::{Database, MemoryStore};

    use super::CachedCollector;
    use crate::{
        collectors::HwScraper,
        metrics::{MetricSample, registry::render_samples},
    };

    const SUCCESS: &str = "sonic_hw_collector_success";

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_hash(
            Database::State,
            "PSU_INFO|PSU1",
            &[("status", "true"), ("presence", "true"), ("input_voltage", "12.1")],
        );
        store.insert_hash(
            Database::State,
            "FAN_INFO|PSU1-Fan1",
            &[("status", "true"), ("presence", "true"), ("speed", "9000")],
        );
        store
    }

    fn collector(store: &MemoryStore) -> CachedCollector<HwScraper> {
        CachedCollector::new(HwScraper::new().unwrap(), Arc::new(store.clone()))
            .with_ttl(Duration::from_secs(15))
    }

    fn success_values(samples: &[MetricSample]) -> Vec<f64> {
        samples
            .iter()
            .filter(|sample| sample.name() == SUCCESS)
            .map(MetricSample::value)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn collects_within_ttl_are_served_from_cache() {
        let store = seeded_store();
        let collector = collector(&store);

        let first = collector.collect_samples().await;
        let commands = store.command_count();
        assert_eq!(store.connect_count(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        let second = collector.collect_samples().await;

        assert_eq!(first, second);
        assert_eq!(render_samples(&first), render_samples(&second));
        assert_eq!(store.connect_count(), 1);
        assert_eq!(store.command_count(), commands);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_triggers_a_new_scrape() {
        let store = seeded_store();
        let collector = collector(&store);

        collector.collect_samples().await;
        tokio::time::advance(Duration::from_secs(16)).await;
        store.remove_hash(Database::State, "FAN_INFO|PSU1-Fan1");
        let samples = collector.collect_samples().await;

        assert_eq!(store.connect_count(), 2);
        assert!(samples.iter().all(|sample| sample.name() != "sonic_hw_fan_rpm"));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_on_fresh_collector_reports_only_success_zero() {
        let store = seeded_store();
        store.set_unavailable(true);
        let collector = collector(&store);

        let samples = collector.collect_samples().await;

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), SUCCESS);
        assert_eq!(samples[0].value(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_success_keeps_previous_samples() {
        let store = seeded_store();
        let collector = collector(&store);

        let good = collector.collect_samples().await;
        tokio::time::advance(Duration::from_secs(20)).await;
        store.set_unavailable(true);
        let degraded = collector.collect_samples().await;

        assert_eq!(degraded.len(), good.len());
        assert_eq!(degraded[..good.len() - 1], good[..good.len() - 1]);
        assert_eq!(success_values(&degraded), vec![0.0]);

        // The failed attempt did not refresh the timestamp, so the next call
        // scrapes again and recovers.
        store.set_unavailable(false);
        let recovered = collector.collect_samples().await;
        assert_eq!(store.connect_count(), 3);
        assert_eq!(success_values(&recovered), vec![1.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn success_indicator_is_emitted_once_per_collect() {
        let store = seeded_store();
        let collector = collector(&store);

        for _ in 0..3 {
            let samples = collector.collect_samples().await;
            assert_eq!(success_values(&samples), vec![1.0]);
            assert_eq!(samples.last().map(MetricSample::name), Some(SUCCESS));
            tokio::time::advance(Duration::from_secs(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_collects_share_one_scrape() {
        let store = seeded_store();
        store.set_latency(Duration::from_millis(500));
        let collector = Arc::new(collector(&store));

        let results = join_all((0..5).map(|_| {
            let collector = Arc::clone(&collector);
            tokio::spawn(async move { collector.collect_samples().await })
        }))
        .await;

        assert_eq!(store.connect_count(), 1);
        let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn store_session_is_released_on_every_path() {
        let store = seeded_store();
        store.fail_on(Database::State, "FAN_INFO|*");
        let collector = collector(&store);

        let samples = collector.collect_samples().await;
        assert_eq!(success_values(&samples), vec![0.0]);
        assert_eq!(store.open_sessions(), 0);

        store.clear_failures();
        collector.collect_samples().await;
        assert_eq!(store.open_sessions(), 0);
    }
}
