use std::sync::Arc;

use async_trait::async_trait;
use sonic_common::error::{ExporterError, Result};
use sonic_redis::{Database, KeyValueStore};
use tracing::trace;

use crate::{
    coerce::coerce_oper_status,
    labels::LabelChain,
    metrics::{
        assembler::SampleSet,
        types::{MetricDescriptor, MetricSample},
    },
    orchestrator::DomainScraper,
    scanner::{KeyRecord, fetch, scan},
};

const SUBSYSTEM: &str = "interface";
const PORT_TABLE_PATTERN: &str = "PORT_TABLE:*";
const PORT_NAME_MAP_KEY: &str = "COUNTERS_PORT_NAME_MAP";
/// Markers written by portsyncd into `PORT_TABLE`; they are not ports.
const PORT_TABLE_MARKERS: [&str; 2] = ["PortConfigDone", "PortInitDone"];
const MEGABITS_TO_BYTES: f64 = 1_000_000.0 / 8.0;

/// Port counters, keyed by the SAI statistic they are read from.
const PORT_COUNTERS: [(&str, &str, &str); 8] = [
    (
        "receive_bytes_total",
        "Number of bytes received",
        "SAI_PORT_STAT_IF_IN_OCTETS",
    ),
    (
        "transmit_bytes_total",
        "Number of bytes transmitted",
        "SAI_PORT_STAT_IF_OUT_OCTETS",
    ),
    (
        "receive_packets_total",
        "Number of unicast packets received",
        "SAI_PORT_STAT_IF_IN_UCAST_PKTS",
    ),
    (
        "transmit_packets_total",
        "Number of unicast packets transmitted",
        "SAI_PORT_STAT_IF_OUT_UCAST_PKTS",
    ),
    (
        "receive_errors_total",
        "Number of errors on receive",
        "SAI_PORT_STAT_IF_IN_ERRORS",
    ),
    (
        "transmit_errors_total",
        "Number of errors on transmit",
        "SAI_PORT_STAT_IF_OUT_ERRORS",
    ),
    (
        "receive_dropped_total",
        "Number of packets dropped on receive",
        "SAI_PORT_STAT_IF_IN_DISCARDS",
    ),
    (
        "transmit_dropped_total",
        "Number of packets dropped on transmit",
        "SAI_PORT_STAT_IF_OUT_DISCARDS",
    ),
];

pub struct InterfaceScraper {
    info: Arc<MetricDescriptor>,
    operational_status: Arc<MetricDescriptor>,
    admin_status: Arc<MetricDescriptor>,
    speed_bytes: Arc<MetricDescriptor>,
    mtu_bytes: Arc<MetricDescriptor>,
    counters: Vec<(Arc<MetricDescriptor>, &'static str)>,
    port_labels: LabelChain,
}

impl InterfaceScraper {
    pub fn new() -> Self {
        Self {
            info: MetricDescriptor::gauge(
                SUBSYSTEM,
                "info",
                "Non-numeric data about interface, value is always 1",
                &["device", "alias", "description"],
            ),
            operational_status: MetricDescriptor::gauge(
                SUBSYSTEM,
                "operational_status",
                "Interface operational status: 0(DOWN), 1(UP)",
                &["device"],
            ),
            admin_status: MetricDescriptor::gauge(
                SUBSYSTEM,
                "admin_status",
                "Interface admin status: 0(DOWN), 1(UP)",
                &["device"],
            ),
            speed_bytes: MetricDescriptor::gauge(
                SUBSYSTEM,
                "speed_bytes",
                "Interface speed in bytes per second",
                &["device"],
            ),
            mtu_bytes: MetricDescriptor::gauge(
                SUBSYSTEM,
                "mtu_bytes",
                "Interface MTU in bytes",
                &["device"],
            ),
            counters: PORT_COUNTERS
                .iter()
                .map(|(name, help, field)| {
                    (MetricDescriptor::counter(SUBSYSTEM, name, help, &["device"]), *field)
                })
                .collect(),
            port_labels: LabelChain::new().split(':', 1),
        }
    }

    async fn collect_port_status(
        &self,
        store: &mut dyn KeyValueStore,
        samples: &mut SampleSet,
    ) -> Result<()> {
        for record in scan(store, Database::Appl, PORT_TABLE_PATTERN).await? {
            if !is_port(&record) {
                trace!(key = %record.key, "skipping non-port entry");
                continue;
            }
            let device = self.port_labels.extract(&record).name;
            let device = device.as_str();

            samples.push_value(
                &self.info,
                1.0,
                &[
                    device,
                    record.field("alias").unwrap_or_default(),
                    record.field("description").unwrap_or_default(),
                ],
            )?;
            samples.push_value(
                &self.operational_status,
                coerce_oper_status(record.field("oper_status")),
                &[device],
            )?;
            samples.push_value(
                &self.admin_status,
                coerce_oper_status(record.field("admin_status")),
                &[device],
            )?;
            samples.push_scaled(&self.speed_bytes, record.field("speed"), MEGABITS_TO_BYTES, &[device])?;
            samples.push_field(&self.mtu_bytes, record.field("mtu"), &[device])?;
        }

        Ok(())
    }

    async fn collect_port_counters(
        &self,
        store: &mut dyn KeyValueStore,
        samples: &mut SampleSet,
    ) -> Result<()> {
        let name_map = fetch(store, Database::Counters, PORT_NAME_MAP_KEY).await?;
        for (device, oid) in &name_map.fields {
            let counters = fetch(store, Database::Counters, &format!("COUNTERS:{oid}")).await?;
            for (descriptor, field) in &self.counters {
                samples.push_field(descriptor, counters.field(field), &[device.as_str()])?;
            }
        }

        Ok(())
    }
}

fn is_port(record: &KeyRecord) -> bool {
    let marker = record
        .key_segment(':', 1)
        .is_some_and(|segment| PORT_TABLE_MARKERS.contains(&segment));
    let has_status = record.field("admin_status").is_some() || record.field("oper_status").is_some();
    !marker && has_status
}

impl Default for InterfaceScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainScraper for InterfaceScraper {
    fn subsystem(&self) -> &'static str {
        SUBSYSTEM
    }

    fn descriptors(&self) -> Vec<Arc<MetricDescriptor>> {
        let mut descriptors = vec![
            Arc::clone(&self.info),
            Arc::clone(&self.operational_status),
            Arc::clone(&self.admin_status),
            Arc::clone(&self.speed_bytes),
            Arc::clone(&self.mtu_bytes),
        ];
        descriptors.extend(self.counters.iter().map(|(descriptor, _)| Arc::clone(descriptor)));
        descriptors
    }

    async fn scrape(&self, store: &mut dyn KeyValueStore) -> Result<Vec<MetricSample>> {
        let mut samples = SampleSet::new();

        self.collect_port_status(store, &mut samples)
            .await
            .map_err(|err| ExporterError::collection(SUBSYSTEM, "port status", err))?;
        self.collect_port_counters(store, &mut samples)
            .await
            .map_err(|err| ExporterError::collection(SUBSYSTEM, "port counters", err))?;

        Ok(samples.into_samples())
    }
}
