//! Command-line interface for rsyslog-exporter
//!
//! Provides argument parsing and subcommand handling for the exporter binary.
//! Flags mirror the historical exporter flags and override the config file.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::syslog::SyslogFormat;
use clap::{Parser, Subcommand};

/// Prometheus exporter for rsyslog impstats
#[derive(Parser)]
#[command(name = "rsyslog-exporter")]
#[command(version)]
#[command(about = "Prometheus exporter for rsyslog impstats messages")]
#[command(
    long_about = "rsyslog-exporter receives rsyslog impstats JSON records over syslog, \
    normalizes them into Prometheus metric families and serves them over HTTP."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    /// ip:port to serve metrics on (":9292" binds all interfaces)
    #[arg(long)]
    pub listen_address: Option<String>,

    /// URL path to serve metrics on
    #[arg(long)]
    pub metrics_endpoint: Option<String>,

    /// proto://ip:port to listen on for the syslog input
    #[arg(long)]
    pub syslog_listen_address: Option<String>,

    /// Syslog version to use (rfc3164, rfc5424)
    #[arg(long)]
    pub syslog_format: Option<SyslogFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    /// Apply command-line flags on top of a loaded configuration
    ///
    /// The result still has to go through `Config::validate`.
    pub fn apply_overrides(&self, config: &mut Config) -> AppResult<()> {
        if let Some(listen_address) = &self.listen_address {
            let (host, port) = listen_address.rsplit_once(':').ok_or_else(|| {
                AppError::Config(format!(
                    "listen address '{}' must be ip:port",
                    listen_address
                ))
            })?;
            config.server.port = port.parse().map_err(|_| {
                AppError::Config(format!(
                    "listen address '{}' has an invalid port",
                    listen_address
                ))
            })?;
            config.server.host = if host.is_empty() {
                "0.0.0.0".to_string()
            } else {
                host.trim_start_matches('[').trim_end_matches(']').to_string()
            };
        }
        if let Some(path) = &self.metrics_endpoint {
            config.server.metrics_path = path.clone();
        }
        if let Some(address) = &self.syslog_listen_address {
            config.syslog.listen_address = address.clone();
        }
        if let Some(format) = self.syslog_format {
            config.syslog.format = format;
        }
        Ok(())
    }
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# rsyslog-exporter Configuration
# ==============================
#
# Every setting below shows its default. Command-line flags override the
# values in this file.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to serve metrics on
port = 9292

# URL path of the Prometheus scrape endpoint (/health is reserved)
metrics_path = "/metrics"

# ─────────────────────────────────────────────────────────────────────────────
# SYSLOG INPUT
# ─────────────────────────────────────────────────────────────────────────────
#
# Point rsyslog's impstats module at this address, for example:
#
#   module(load="impstats" interval="10" format="json" ruleset="stats")
#   ruleset(name="stats") {
#       action(type="omfwd" target="127.0.0.1" port="5145" protocol="udp")
#   }

[syslog]
# proto://ip:port, proto is "udp" or "tcp" (newline-delimited)
listen_address = "udp://0.0.0.0:5145"

# Syslog header format: "rfc3164" or "rfc5424"
format = "rfc3164"

# Messages buffered between the listener and the parser
channel_capacity = 1024

# ─────────────────────────────────────────────────────────────────────────────
# STATS RECORDS
# ─────────────────────────────────────────────────────────────────────────────

[stats]
# Prefix of every exported impstats metric
metric_prefix = "rsyslog"

# JSON keys holding the record name and origin
name_field = "name"
origin_field = "origin"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG takes precedence when set
log_level = "info"
"#
}
