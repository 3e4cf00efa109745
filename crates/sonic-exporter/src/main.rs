use std::sync::Arc;

use clap::Parser;
use sonic_exporter::{
    cli::{Cli, LogFormat},
    router::{ExporterState, exporter_router},
};
use sonic_redis::RedisConnector;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(cli.log_level.parse()?)
        .from_env_lossy();
    match cli.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(env_filter).init(),
        LogFormat::Logfmt => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }

    let connector = RedisConnector::from_env()?;
    info!(
        address = %connector.config().address,
        network = %connector.config().network,
        "using redis store"
    );

    let state = ExporterState::new(Arc::new(connector), cli.cache_ttl(), cli.telemetry_path.clone())?;
    let app = exporter_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&cli.listen_address).await?;
    info!(
        telemetry_path = %cli.telemetry_path,
        "sonic exporter listening on {}",
        cli.listen_address
    );
    axum::serve(listener, app).await?;

    Ok(())
}
