//! HTTP request handlers for the scrape endpoint

use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::Metrics;
use crate::stats::RsyslogStats;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod metrics;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers. The stats
/// engine is the same instance the syslog parser task writes to.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    stats: Arc<RsyslogStats>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState around an existing stats engine
    pub fn new(config: Arc<Config>, stats: Arc<RsyslogStats>) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new(Arc::clone(&stats))?);

        Ok(Self {
            config,
            stats,
            metrics,
        })
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the stats engine
    pub fn stats(&self) -> &RsyslogStats {
        &self.stats
    }

    /// Get reference to the Prometheus registry
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the HTTP router: `/health` plus the configured metrics path
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config().server.metrics_path.clone();

    Router::new()
        .route("/health", get(health::handler))
        .route(&metrics_path, get(metrics::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
