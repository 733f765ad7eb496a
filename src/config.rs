//! Configuration management for rsyslog-exporter
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section is optional; a missing file section falls back to the
//! defaults the exporter has always shipped with.

use crate::stats::sanitize::sanitize;
use crate::syslog::{ListenAddress, SyslogFormat};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub syslog: SyslogConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration for the scrape endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl ServerConfig {
    /// Socket address of the scrape endpoint
    pub fn socket_addr(&self) -> crate::error::AppResult<SocketAddr> {
        let ip = self.host.parse::<IpAddr>().map_err(|_| {
            crate::error::AppError::Config(format!(
                "server.host '{}' must be an IP address (e.g. '127.0.0.1' or '0.0.0.0')",
                self.host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9292
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Syslog input configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyslogConfig {
    /// `udp://host:port` or `tcp://host:port`
    #[serde(default = "default_syslog_address")]
    pub listen_address: String,
    #[serde(default)]
    pub format: SyslogFormat,
    /// Capacity of the queue between the listener and the parser
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            listen_address: default_syslog_address(),
            format: SyslogFormat::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl SyslogConfig {
    /// Parsed form of `listen_address`
    pub fn address(&self) -> crate::error::AppResult<ListenAddress> {
        self.listen_address.parse()
    }
}

fn default_syslog_address() -> String {
    "udp://0.0.0.0:5145".to_string()
}

fn default_channel_capacity() -> usize {
    1024
}

/// Stats record interpretation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatsConfig {
    /// Prefix of every exported table metric
    #[serde(default = "default_metric_prefix")]
    pub metric_prefix: String,
    /// Key holding the record name
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// Key holding the record origin
    #[serde(default = "default_origin_field")]
    pub origin_field: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            metric_prefix: default_metric_prefix(),
            name_field: default_name_field(),
            origin_field: default_origin_field(),
        }
    }
}

fn default_metric_prefix() -> String {
    "rsyslog".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_origin_field() -> String {
    "origin".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing or after CLI overrides
    pub fn validate(&self) -> crate::error::AppResult<()> {
        let prefix = &self.stats.metric_prefix;
        if prefix.is_empty() {
            return Err(crate::error::AppError::Config(
                "stats.metric_prefix must not be empty".to_string(),
            ));
        }
        if sanitize(prefix) != *prefix || !prefix.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(crate::error::AppError::Config(format!(
                "stats.metric_prefix '{}' is not a valid metric name prefix. \
                Use lowercase letters, digits and single underscores, starting with a letter \
                (e.g. 'rsyslog').",
                prefix
            )));
        }

        if self.stats.name_field.is_empty() || self.stats.origin_field.is_empty() {
            return Err(crate::error::AppError::Config(
                "stats.name_field and stats.origin_field must not be empty".to_string(),
            ));
        }
        if self.stats.name_field == self.stats.origin_field {
            return Err(crate::error::AppError::Config(format!(
                "stats.name_field and stats.origin_field must differ, both are '{}'",
                self.stats.name_field
            )));
        }

        self.server.socket_addr()?;

        let metrics_path = &self.server.metrics_path;
        if !metrics_path.starts_with('/') {
            return Err(crate::error::AppError::Config(format!(
                "server.metrics_path '{}' must start with '/'",
                metrics_path
            )));
        }
        if metrics_path == "/health" {
            return Err(crate::error::AppError::Config(
                "server.metrics_path cannot be '/health', that path serves the health check"
                    .to_string(),
            ));
        }

        self.syslog.address()?;
        if self.syslog.channel_capacity == 0 {
            return Err(crate::error::AppError::Config(
                "syslog.channel_capacity must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.observability.log_level.as_str()) {
            return Err(crate::error::AppError::Config(format!(
                "observability.log_level '{}' is not one of: {}",
                self.observability.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_historical_flags() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9292);
        assert_eq!(config.server.metrics_path, "/metrics");
        assert_eq!(config.syslog.listen_address, "udp://0.0.0.0:5145");
        assert_eq!(config.syslog.format, SyslogFormat::Rfc3164);
        assert_eq!(config.stats.metric_prefix, "rsyslog");
        assert_eq!(config.stats.name_field, "name");
        assert_eq!(config.stats.origin_field, "origin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 9292);
        assert_eq!(config.syslog.channel_capacity, 1024);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9393
            metrics_path = "/stats"

            [syslog]
            listen_address = "tcp://127.0.0.1:6514"
            format = "rfc5424"
            channel_capacity = 16

            [stats]
            metric_prefix = "syslog"
            name_field = "stat"
            origin_field = "module"

            [observability]
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.metrics_path, "/stats");
        assert_eq!(config.syslog.format, SyslogFormat::Rfc5424);
        assert_eq!(config.stats.name_field, "stat");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_prefix() {
        for prefix in ["", "Rsyslog", "rsys log", "9lives", "rsyslog_"] {
            let mut config = Config::default();
            config.stats.metric_prefix = prefix.to_string();
            assert!(config.validate().is_err(), "prefix {:?} should be rejected", prefix);
        }
    }

    #[test]
    fn test_rejects_identical_name_and_origin_fields() {
        let mut config = Config::default();
        config.stats.origin_field = "name".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must differ"), "got: {}", err);
    }

    #[test]
    fn test_rejects_bad_metrics_path() {
        let mut config = Config::default();
        config.server.metrics_path = "metrics".to_string();
        assert!(config.validate().is_err());

        config.server.metrics_path = "/health".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_host_that_is_not_an_ip() {
        let mut config = Config::default();
        config.server.host = "localhost".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.host"), "got: {}", err);

        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9393;
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "127.0.0.1:9393".parse::<SocketAddr>().unwrap()
        );

        config.server.host = "::1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_syslog_address() {
        let mut config = Config::default();
        config.syslog.listen_address = "http://0.0.0.0:5145".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_channel_capacity() {
        let mut config = Config::default();
        config.syslog.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.observability.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_syslog_format() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [syslog]
            format = "rfc9999"
            "#,
        );
        assert!(result.is_err());
    }
}
