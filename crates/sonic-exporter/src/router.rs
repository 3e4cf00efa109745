use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use sonic_collector::{CachedCollector, CollectorRegistry, CrmScraper, HwScraper, InterfaceScraper};
use sonic_common::error::Result;
use sonic_redis::StoreConnector;
use tower_http::trace::TraceLayer;

use crate::handlers;

pub struct ExporterState {
    pub registry: Arc<CollectorRegistry>,
    pub telemetry_path: String,
}

impl ExporterState {
    /// Registers the interface, hardware and CRM collectors, in that order,
    /// against a shared store connector.
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        cache_ttl: Duration,
        telemetry_path: impl Into<String>,
    ) -> Result<Self> {
        let registry = CollectorRegistry::new();
        registry.register(Arc::new(
            CachedCollector::new(InterfaceScraper::new(), Arc::clone(&connector)).with_ttl(cache_ttl),
        ))?;
        registry.register(Arc::new(
            CachedCollector::new(HwScraper::new()?, Arc::clone(&connector)).with_ttl(cache_ttl),
        ))?;
        registry.register(Arc::new(
            CachedCollector::new(CrmScraper::new(), connector).with_ttl(cache_ttl),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            telemetry_path: telemetry_path.into(),
        })
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    let telemetry_path = state.telemetry_path.clone();

    Router::new()
        .route(&telemetry_path, get(handlers::metrics::prometheus_metrics))
        .route("/", get(handlers::landing::landing_page))
        .route("/healthz", get(handlers::health::health_live))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
