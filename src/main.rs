//! rsyslog-exporter HTTP server
//!
//! Listens for impstats messages on the syslog input and serves the resulting
//! metrics for Prometheus to scrape.

use clap::Parser;
use rsyslog_exporter::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    stats::RsyslogStats,
    syslog::{self, SyslogListener},
    telemetry,
};
use std::path::Path;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = &cli.command {
        match output {
            Some(path) => {
                std::fs::write(path, generate_config_template())?;
                eprintln!("Configuration template written to {}", path);
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    // The exporter runs with built-in defaults when no config file is present
    let mut config = if cli.config == DEFAULT_CONFIG_PATH && !Path::new(&cli.config).exists() {
        Config::default()
    } else {
        Config::from_file(&cli.config)?
    };
    cli.apply_overrides(&mut config)?;
    config.validate()?;

    // Initialize telemetry
    telemetry::init(&config.observability.log_level);

    let stats = Arc::new(RsyslogStats::new(config.stats.clone()));

    let syslog_address = config.syslog.address()?;
    let listener = SyslogListener::bind(&syslog_address).await?;
    tracing::info!(
        address = %syslog_address,
        format = %config.syslog.format,
        "Syslog input ready"
    );
    syslog::start_ingest(
        listener,
        Arc::clone(&stats),
        config.syslog.format,
        config.syslog.channel_capacity,
    );

    let addr = config.server.socket_addr()?;
    let metrics_path = config.server.metrics_path.clone();

    let state = AppState::new(Arc::new(config), stats)?;
    let app = handlers::router(state);

    tracing::info!("Starting rsyslog-exporter on {}", addr);
    tracing::info!("Metrics available at http://{}{}", addr, metrics_path);
    tracing::info!("Health check available at http://{}/health", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
