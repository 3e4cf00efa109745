use std::sync::Arc;

use async_trait::async_trait;
use sonic_common::error::{ExporterError, Result};
use sonic_redis::{Database, KeyValueStore};

use crate::{
    metrics::{
        assembler::SampleSet,
        types::{MetricDescriptor, MetricSample},
    },
    orchestrator::DomainScraper,
    scanner::{KeyRecord, fetch, scan},
};

const SUBSYSTEM: &str = "crm";
const CRM_STATS_KEY: &str = "CRM:STATS";
const CRM_ACL_KEY_PATTERN: &str = "CRM:ACL_STATS:*";
const STAT_PREFIX: &str = "crm_stats_";

/// Critical resource monitoring counters from COUNTERS_DB.
pub struct CrmScraper {
    resource_available: Arc<MetricDescriptor>,
    resource_used: Arc<MetricDescriptor>,
    acl_resource_available: Arc<MetricDescriptor>,
    acl_resource_used: Arc<MetricDescriptor>,
}

impl CrmScraper {
    pub fn new() -> Self {
        Self {
            resource_available: MetricDescriptor::gauge(
                SUBSYSTEM,
                "resource_available",
                "Maximum available value for a resource",
                &["resource"],
            ),
            resource_used: MetricDescriptor::gauge(
                SUBSYSTEM,
                "resource_used",
                "Used value for a resource",
                &["resource"],
            ),
            acl_resource_available: MetricDescriptor::gauge(
                SUBSYSTEM,
                "acl_resource_available",
                "Maximum available value for an ACL resource",
                &["acl_target", "resource"],
            ),
            acl_resource_used: MetricDescriptor::gauge(
                SUBSYSTEM,
                "acl_resource_used",
                "Used value for an ACL resource",
                &["acl_target", "resource"],
            ),
        }
    }

    async fn collect_stats(
        &self,
        store: &mut dyn KeyValueStore,
        samples: &mut SampleSet,
    ) -> Result<()> {
        let stats = fetch(store, Database::Counters, CRM_STATS_KEY).await?;
        for (stat, value) in &stats.fields {
            match parse_stat(stat) {
                Some((resource, StatKind::Available)) => {
                    samples.push_field(&self.resource_available, Some(value.as_str()), &[resource])?
                }
                Some((resource, StatKind::Used)) => {
                    samples.push_field(&self.resource_used, Some(value.as_str()), &[resource])?
                }
                None => {}
            }
        }

        Ok(())
    }

    async fn collect_acl_stats(
        &self,
        store: &mut dyn KeyValueStore,
        samples: &mut SampleSet,
    ) -> Result<()> {
        for record in scan(store, Database::Counters, CRM_ACL_KEY_PATTERN).await? {
            let target = acl_target(&record);
            for (stat, value) in &record.fields {
                match parse_stat(stat) {
                    Some((resource, StatKind::Available)) => samples.push_field(
                        &self.acl_resource_available,
                        Some(value.as_str()),
                        &[target.as_str(), resource],
                    )?,
                    Some((resource, StatKind::Used)) => samples.push_field(
                        &self.acl_resource_used,
                        Some(value.as_str()),
                        &[target.as_str(), resource],
                    )?,
                    None => {}
                }
            }
        }

        Ok(())
    }
}

impl Default for CrmScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainScraper for CrmScraper {
    fn subsystem(&self) -> &'static str {
        SUBSYSTEM
    }

    fn descriptors(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.resource_available),
            Arc::clone(&self.resource_used),
            Arc::clone(&self.acl_resource_available),
            Arc::clone(&self.acl_resource_used),
        ]
    }

    async fn scrape(&self, store: &mut dyn KeyValueStore) -> Result<Vec<MetricSample>> {
        let mut samples = SampleSet::new();

        self.collect_stats(store, &mut samples)
            .await
            .map_err(|err| ExporterError::collection(SUBSYSTEM, "crm stats", err))?;
        self.collect_acl_stats(store, &mut samples)
            .await
            .map_err(|err| ExporterError::collection(SUBSYSTEM, "crm acl stats", err))?;

        Ok(samples.into_samples())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatKind {
    Available,
    Used,
}

/// Splits `crm_stats_ipv4_route_used` into `("ipv4_route", Used)`.
fn parse_stat(stat: &str) -> Option<(&str, StatKind)> {
    let stat = stat.strip_prefix(STAT_PREFIX).unwrap_or(stat);
    if let Some(resource) = stat.strip_suffix("_available") {
        return Some((resource, StatKind::Available));
    }
    stat.strip_suffix("_used")
        .map(|resource| (resource, StatKind::Used))
}

/// `CRM:ACL_STATS:INGRESS:PORT` becomes `ingress_port`.
fn acl_target(record: &KeyRecord) -> String {
    record
        .key
        .split(':')
        .skip(2)
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
