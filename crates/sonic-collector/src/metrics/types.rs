use std::sync::Arc;

use sonic_common::error::{ExporterError, Result};

pub const NAMESPACE: &str = "sonic";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub label_names: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(
        subsystem: &str,
        name: &str,
        help: &str,
        metric_type: MetricType,
        label_names: &[&str],
    ) -> Arc<Self> {
        Arc::new(Self {
            name: fq_name(NAMESPACE, subsystem, name),
            help: help.to_string(),
            metric_type,
            label_names: label_names.iter().map(|label| (*label).to_string()).collect(),
        })
    }

    pub fn gauge(subsystem: &str, name: &str, help: &str, label_names: &[&str]) -> Arc<Self> {
        Self::new(subsystem, name, help, MetricType::Gauge, label_names)
    }

    pub fn counter(subsystem: &str, name: &str, help: &str, label_names: &[&str]) -> Arc<Self> {
        Self::new(subsystem, name, help, MetricType::Counter, label_names)
    }
}

/// One exposition line. The label values are positional and always line up
/// with `descriptor.label_names`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    descriptor: Arc<MetricDescriptor>,
    value: f64,
    label_values: Vec<String>,
}

impl MetricSample {
    pub fn new(
        descriptor: &Arc<MetricDescriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self> {
        if label_values.len() != descriptor.label_names.len() {
            return Err(ExporterError::LabelArity {
                metric: descriptor.name.clone(),
                expected: descriptor.label_names.len(),
                actual: label_values.len(),
            });
        }

        Ok(Self {
            descriptor: Arc::clone(descriptor),
            value,
            label_values,
        })
    }

    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .label_names
            .iter()
            .position(|label| label == name)
            .map(|index| self.label_values[index].as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.descriptor
            .label_names
            .iter()
            .map(String::as_str)
            .zip(self.label_values.iter().map(String::as_str))
    }
}

fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
