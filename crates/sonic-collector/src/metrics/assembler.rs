use std::sync::Arc;

use sonic_common::error::Result;
use tracing::trace;

use crate::{
    coerce::coerce_f64,
    metrics::types::{MetricDescriptor, MetricSample},
};

/// Builds zero or one sample from a raw field. An absent or unparsable field
/// produces no sample.
pub fn assemble(
    descriptor: &Arc<MetricDescriptor>,
    raw: Option<&str>,
    label_values: &[&str],
) -> Result<Option<MetricSample>> {
    let Some(value) = coerce_f64(raw) else {
        if let Some(raw) = raw {
            trace!(metric = %descriptor.name, raw, "skipping unparsable field");
        }
        return Ok(None);
    };

    constant(descriptor, value, label_values).map(Some)
}

/// Builds a sample whose value is already known, such as an info metric or a
/// coerced flag.
pub fn constant(
    descriptor: &Arc<MetricDescriptor>,
    value: f64,
    label_values: &[&str],
) -> Result<MetricSample> {
    MetricSample::new(
        descriptor,
        value,
        label_values.iter().map(|value| (*value).to_string()).collect(),
    )
}

/// Append-only sample buffer used by the domain scrapers.
#[derive(Debug, Default)]
pub struct SampleSet {
    samples: Vec<MetricSample>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_field(
        &mut self,
        descriptor: &Arc<MetricDescriptor>,
        raw: Option<&str>,
        label_values: &[&str],
    ) -> Result<()> {
        if let Some(sample) = assemble(descriptor, raw, label_values)? {
            self.samples.push(sample);
        }
        Ok(())
    }

    /// Like [`SampleSet::push_field`], with the parsed value scaled before
    /// it is recorded.
    pub fn push_scaled(
        &mut self,
        descriptor: &Arc<MetricDescriptor>,
        raw: Option<&str>,
        factor: f64,
        label_values: &[&str],
    ) -> Result<()> {
        if let Some(value) = coerce_f64(raw) {
            self.push_value(descriptor, value * factor, label_values)?;
        }
        Ok(())
    }

    pub fn push_value(
        &mut self,
        descriptor: &Arc<MetricDescriptor>,
        value: f64,
        label_values: &[&str],
    ) -> Result<()> {
        self.samples.push(constant(descriptor, value, label_values)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::{SampleSet, assemble};
    use crate::metrics::types::MetricDescriptor;

    #[test]
    fn absent_or_malformed_fields_yield_no_sample() {
        let descriptor = MetricDescriptor::gauge("hw", "psu_temperature_celsius", "PSU temperature", &["slot"]);

        assert!(assemble(&descriptor, None, &["PSU1"]).unwrap().is_none());
        assert!(assemble(&descriptor, Some("N/A"), &["PSU1"]).unwrap().is_none());

        let sample = assemble(&descriptor, Some("31.5"), &["PSU1"]).unwrap().unwrap();
        assert_eq!(sample.value(), 31.5);
        assert_eq!(sample.label_values(), ["PSU1"]);
    }

    #[test]
    fn one_malformed_field_drops_only_its_sample() {
        let volts = MetricDescriptor::gauge("hw", "psu_input_voltage_volts", "PSU input voltage", &["slot"]);
        let amps = MetricDescriptor::gauge("hw", "psu_input_current_amperes", "PSU input current", &["slot"]);
        let temp = MetricDescriptor::gauge("hw", "psu_temperature_celsius", "PSU temperature", &["slot"]);

        let mut samples = SampleSet::new();
        samples.push_field(&volts, Some("12.1"), &["PSU1"]).unwrap();
        samples.push_field(&amps, Some("garbage"), &["PSU1"]).unwrap();
        samples.push_field(&temp, Some("40"), &["PSU1"]).unwrap();

        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn label_arity_mismatch_is_an_error() {
        let descriptor = MetricDescriptor::gauge("hw", "fan_rpm", "Fan RPM", &["name", "slot"]);
        assert!(assemble(&descriptor, Some("1200"), &["Fan1"]).is_err());
    }
}
