use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use futures::future::join_all;
use sonic_common::error::{ExporterError, Result};

use crate::metrics::types::{MetricDescriptor, MetricSample};

/// A source of samples for the exposition endpoint.
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Never fails; scrape health is reported through the samples themselves.
    async fn collect(&self) -> Vec<MetricSample>;
}

pub struct CollectorRegistry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self {
            collectors: RwLock::new(Vec::new()),
        }
    }

    /// Adds a collector. Collector names and metric names must be unique
    /// across the registry.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let mut collectors = self.collectors.write().map_err(|_| {
            ExporterError::InvalidArgument("failed to acquire collector registry lock".to_string())
        })?;

        if collectors.iter().any(|existing| existing.name() == collector.name()) {
            return Err(ExporterError::InvalidArgument(format!(
                "collector already registered: {}",
                collector.name()
            )));
        }

        let registered: HashSet<String> = collectors
            .iter()
            .flat_map(|existing| existing.describe())
            .map(|descriptor| descriptor.name.clone())
            .collect();
        if let Some(duplicate) = collector
            .describe()
            .into_iter()
            .find(|descriptor| registered.contains(&descriptor.name))
        {
            return Err(ExporterError::InvalidArgument(format!(
                "metric already registered: {}",
                duplicate.name
            )));
        }

        collectors.push(collector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.collectors.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collects every registered collector concurrently and concatenates the
    /// results in registration order.
    pub async fn gather(&self) -> Vec<MetricSample> {
        let collectors = match self.collectors.read() {
            Ok(guard) => guard.clone(),
            Err(_) => return Vec::new(),
        };

        join_all(collectors.iter().map(|collector| collector.collect()))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    pub async fn render_prometheus(&self) -> String {
        render_samples(&self.gather().await)
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders samples in the text exposition format. Samples of one family are
/// grouped under a single HELP/TYPE header placed where the family first
/// appears; within a family the input order is kept.
pub fn render_samples(samples: &[MetricSample]) -> String {
    let mut families: Vec<(&Arc<MetricDescriptor>, Vec<&MetricSample>)> = Vec::new();
    for sample in samples {
        match families
            .iter_mut()
            .find(|(descriptor, _)| descriptor.name == sample.name())
        {
            Some((_, members)) => members.push(sample),
            None => families.push((sample.descriptor(), vec![sample])),
        }
    }

    let mut output = String::new();
    for (descriptor, members) in families {
        output.push_str("# HELP ");
        output.push_str(&descriptor.name);
        output.push(' ');
        output.push_str(&escape_help(&descriptor.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(&descriptor.name);
        output.push(' ');
        output.push_str(descriptor.metric_type.as_prometheus_type());
        output.push('\n');

        for sample in members {
            output.push_str(&render_sample_line(sample));
        }
    }

    output
}

fn render_sample_line(sample: &MetricSample) -> String {
    let mut rendered = String::new();
    rendered.push_str(sample.name());

    if !sample.label_values().is_empty() {
        rendered.push('{');
        for (index, (key, value)) in sample.labels().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(sample.value()));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
