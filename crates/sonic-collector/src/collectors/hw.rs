use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use sonic_common::error::{ExporterError, Result};
use sonic_redis::{Database, KeyValueStore};

use crate::{
    coerce::coerce_flag,
    labels::LabelChain,
    metrics::{
        assembler::SampleSet,
        types::{MetricDescriptor, MetricSample},
    },
    orchestrator::DomainScraper,
    scanner::scan,
};

const SUBSYSTEM: &str = "hw";
const PSU_KEY_PATTERN: &str = "PSU_INFO|PSU*";
const FAN_KEY_PATTERN: &str = "FAN_INFO|*";
const CHASSIS_KEY_PATTERN: &str = "CHASSIS_INFO|*";

/// Power supplies, fans and chassis data from STATE_DB.
pub struct HwScraper {
    psu_info: Arc<MetricDescriptor>,
    psu_input_voltage_volts: Arc<MetricDescriptor>,
    psu_input_current_amperes: Arc<MetricDescriptor>,
    psu_output_voltage_volts: Arc<MetricDescriptor>,
    psu_output_current_amperes: Arc<MetricDescriptor>,
    psu_operational_status: Arc<MetricDescriptor>,
    psu_available_status: Arc<MetricDescriptor>,
    psu_temperature_celsius: Arc<MetricDescriptor>,
    fan_rpm: Arc<MetricDescriptor>,
    fan_operational_status: Arc<MetricDescriptor>,
    fan_available_status: Arc<MetricDescriptor>,
    chassis_info: Arc<MetricDescriptor>,
    psu_labels: LabelChain,
    fan_labels: LabelChain,
    chassis_labels: LabelChain,
}

impl HwScraper {
    pub fn new() -> Result<Self> {
        let psu_regex = compile(r"(?i)^PSU_INFO\|(?P<slot>.+)$")?;
        let fan_regex =
            compile(r"(?i)FAN_INFO\|(?P<slot>PSU\d+|Fantray\d+)(\s|-)(?P<name>.+)")?;

        Ok(Self {
            psu_info: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_info",
                "Non-numeric data about PSU, value is always 1",
                &["slot", "serial", "model_name", "model"],
            ),
            psu_input_voltage_volts: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_input_voltage_volts",
                "PSU input voltage",
                &["slot"],
            ),
            psu_input_current_amperes: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_input_current_amperes",
                "PSU input current",
                &["slot"],
            ),
            psu_output_voltage_volts: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_output_voltage_volts",
                "PSU output voltage",
                &["slot"],
            ),
            psu_output_current_amperes: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_output_current_amperes",
                "PSU output current",
                &["slot"],
            ),
            psu_operational_status: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_operational_status",
                "PSU operational status: 0(DOWN), 1(UP)",
                &["slot"],
            ),
            psu_available_status: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_available_status",
                "PSU availability status: not plugged in - 0, plugged in - 1",
                &["slot"],
            ),
            psu_temperature_celsius: MetricDescriptor::gauge(
                SUBSYSTEM,
                "psu_temperature_celsius",
                "PSU temperature",
                &["slot"],
            ),
            fan_rpm: MetricDescriptor::gauge(SUBSYSTEM, "fan_rpm", "Fan RPM", &["name", "slot"]),
            fan_operational_status: MetricDescriptor::gauge(
                SUBSYSTEM,
                "fan_operational_status",
                "Fan operational status: 0(DOWN), 1(UP)",
                &["name", "slot"],
            ),
            fan_available_status: MetricDescriptor::gauge(
                SUBSYSTEM,
                "fan_available_status",
                "Fan availability status: not plugged in - 0, plugged in - 1",
                &["name", "slot"],
            ),
            chassis_info: MetricDescriptor::gauge(
                SUBSYSTEM,
                "chassis_info",
                "Non-numeric data about chassis, value is always 1",
                &["name", "psu_num", "serial", "model"],
            ),
            psu_labels: LabelChain::new().regex(psu_regex).split('|', 1),
            fan_labels: LabelChain::new()
                .regex(fan_regex)
                .split('|', 1)
                .field_override("drawer_name", "N/A"),
            chassis_labels: LabelChain::new().split('|', 1),
        })
    }

    async fn collect_psu_info(
        &self,
        store: &mut dyn KeyValueStore,
        samples: &mut SampleSet,
    ) -> Result<()> {
        for record in scan(store, Database::State, PSU_KEY_PATTERN).await? {
            // `PSU_INFO|PSU 1` is reported as slot `PSU1`.
            let slot: String = self.psu_labels.extract(&record).slot.split_whitespace().collect();
            let slot = slot.as_str();

            samples.push_value(
                &self.psu_info,
                1.0,
                &[
                    slot,
                    record.field("serial").unwrap_or_default(),
                    record.field("name").unwrap_or_default(),
                    record.field("model").unwrap_or_default(),
                ],
            )?;
            samples.push_value(
                &self.psu_operational_status,
                coerce_flag(record.field("status")),
                &[slot],
            )?;
            samples.push_value(
                &self.psu_available_status,
                coerce_flag(record.field("presence")),
                &[slot],
            )?;

            samples.push_field(&self.psu_input_voltage_volts, record.field("input_voltage"), &[slot])?;
            samples.push_field(&self.psu_input_current_amperes, record.field("input_current"), &[slot])?;
            samples.push_field(&self.psu_output_voltage_volts, record.field("output_voltage"), &[slot])?;
            samples.push_field(&self.psu_output_current_amperes, record.field("output_current"), &[slot])?;
            samples.push_field(&self.psu_temperature_celsius, record.field("temp"), &[slot])?;
        }

        Ok(())
    }

    async fn collect_fan_info(
        &self,
        store: &mut dyn KeyValueStore,
        samples: &mut SampleSet,
    ) -> Result<()> {
        for record in scan(store, Database::State, FAN_KEY_PATTERN).await? {
            let labels = self.fan_labels.extract(&record);
            let label_values = [labels.name.as_str(), labels.slot.as_str()];

            samples.push_value(
                &self.fan_operational_status,
                coerce_flag(record.field("status")),
                &label_values,
            )?;
            samples.push_value(
                &self.fan_available_status,
                coerce_flag(record.field("presence")),
                &label_values,
            )?;
            samples.push_field(&self.fan_rpm, record.field("speed"), &label_values)?;
        }

        Ok(())
    }

    async fn collect_chassis_info(
        &self,
        store: &mut dyn KeyValueStore,
        samples: &mut SampleSet,
    ) -> Result<()> {
        for record in scan(store, Database::State, CHASSIS_KEY_PATTERN).await? {
            let name = self.chassis_labels.extract(&record).name;
            samples.push_value(
                &self.chassis_info,
                1.0,
                &[
                    name.as_str(),
                    record.field("psu_num").unwrap_or_default(),
                    record.field("serial").unwrap_or_default(),
                    record.field("model").unwrap_or_default(),
                ],
            )?;
        }

        Ok(())
    }
}

#[async_trait]
impl DomainScraper for HwScraper {
    fn subsystem(&self) -> &'static str {
        SUBSYSTEM
    }

    fn descriptors(&self) -> Vec<Arc<MetricDescriptor>> {
        [
            &self.psu_info,
            &self.psu_input_voltage_volts,
            &self.psu_input_current_amperes,
            &self.psu_output_voltage_volts,
            &self.psu_output_current_amperes,
            &self.psu_operational_status,
            &self.psu_available_status,
            &self.psu_temperature_celsius,
            &self.fan_rpm,
            &self.fan_operational_status,
            &self.fan_available_status,
            &self.chassis_info,
        ]
        .into_iter()
        .map(Arc::clone)
        .collect()
    }

    async fn scrape(&self, store: &mut dyn KeyValueStore) -> Result<Vec<MetricSample>> {
        let mut samples = SampleSet::new();

        self.collect_psu_info(store, &mut samples)
            .await
            .map_err(|err| ExporterError::collection(SUBSYSTEM, "psu info", err))?;
        self.collect_fan_info(store, &mut samples)
            .await
            .map_err(|err| ExporterError::collection(SUBSYSTEM, "fan info", err))?;
        self.collect_chassis_info(store, &mut samples)
            .await
            .map_err(|err| ExporterError::collection(SUBSYSTEM, "chassis info", err))?;

        Ok(samples.into_samples())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|err| ExporterError::Config(format!("invalid label pattern {pattern}: {err}")))
}
