//! Prometheus metrics endpoint
//!
//! Exposes the stats table in Prometheus text format for scraping.

use axum::{extract::State, http::StatusCode};

use crate::error::AppResult;
use crate::handlers::AppState;

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` with a JSON error body if encoding fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:9292/metrics
/// # HELP rsyslog_exporter_parsed_messages Amount of rsyslog stat messages parsed
/// # TYPE rsyslog_exporter_parsed_messages counter
/// rsyslog_exporter_parsed_messages 42
/// ```
pub async fn handler(State(state): State<AppState>) -> AppResult<(StatusCode, String)> {
    let output = state.metrics().gather().inspect_err(|e| {
        tracing::error!(
            error = %e,
            "Failed to gather metrics for Prometheus scraping. \
            This indicates a metrics encoding issue (invalid UTF-8, \
            corrupted labels, or encoder failure)."
        );
    })?;

    Ok((StatusCode::OK, output))
}
