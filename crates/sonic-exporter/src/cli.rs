use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Logfmt,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sonic-exporter", about = "Prometheus exporter for SONiC switches")]
pub struct Cli {
    /// Address on which to expose metrics and the landing page.
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9101")]
    pub listen_address: String,

    /// Path under which to expose metrics.
    #[arg(
        long = "web.telemetry-path",
        default_value = "/metrics",
        value_parser = parse_telemetry_path
    )]
    pub telemetry_path: String,

    /// Minimum level for log output; RUST_LOG takes precedence.
    #[arg(long = "log.level", default_value = "info")]
    pub log_level: String,

    /// Output format of log messages.
    #[arg(long = "log.format", value_enum, default_value_t = LogFormat::Logfmt)]
    pub log_format: LogFormat,

    /// Seconds a successful scrape is served from memory.
    #[arg(long = "collector.cache-ttl", default_value_t = 15)]
    pub cache_ttl: u64,
}

impl Cli {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

fn parse_telemetry_path(value: &str) -> Result<String, String> {
    if !value.starts_with('/') {
        return Err(format!("telemetry path must start with '/': {value}"));
    }
    if value.contains(['{', '}', '*']) {
        return Err(format!("telemetry path must be a literal path: {value}"));
    }
    if value == "/" || value == "/healthz" {
        return Err(format!("telemetry path {value} is reserved"));
    }
    Ok(value.to_string())
}
