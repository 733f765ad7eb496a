//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Default filter directive for the given level
///
/// HTTP access logs from tower-http stay at info so per-scrape traces do not
/// drown out parse failures.
pub fn default_directive(level: &str) -> String {
    format!("rsyslog_exporter={},tower_http=info", level)
}

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently ignored.
///
/// Reads log level from RUST_LOG environment variable, defaulting to the
/// level specified in config (or "info" if not set).
///
/// # Examples
///
/// ```no_run
/// rsyslog_exporter::telemetry::init("info");
/// tracing::info!("Exporter started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
