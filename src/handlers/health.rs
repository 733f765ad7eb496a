//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers, along
//! with the parser counters so operators can tell whether impstats data is
//! still arriving.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Stats records merged so far
    pub parsed_messages: u64,
    /// Records and fields rejected so far
    pub parser_failures: u64,
    /// Unix seconds of the last successful parse, 0 if none yet
    pub last_parse_timestamp: i64,
}

/// Health check handler
///
/// Always returns 200 OK while the server is running. The counters come from
/// one consistent snapshot.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = state.stats().snapshot();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            parsed_messages: snapshot.parsed_messages,
            parser_failures: snapshot.parser_failures,
            last_parse_timestamp: snapshot.parse_timestamp,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::stats::RsyslogStats;
    use axum::extract::State;
    use std::sync::Arc;

    fn create_test_state() -> AppState {
        let config: Config = toml::from_str("").expect("should parse test config");
        AppState::new(Arc::new(config), Arc::new(RsyslogStats::default()))
            .expect("should create AppState")
    }

    #[tokio::test]
    async fn test_health_handler_returns_ok() {
        let state = create_test_state();
        let (status, Json(body)) = handler(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "OK");
        assert_eq!(body.parsed_messages, 0);
        assert_eq!(body.last_parse_timestamp, 0);
    }

    #[tokio::test]
    async fn test_health_handler_reports_counters() {
        let state = create_test_state();
        state
            .stats()
            .parse(r#"{"name": "main Q", "origin": "core.queue", "size": 1}"#)
            .unwrap();
        let _ = state.stats().parse("{ broken");

        let (status, Json(body)) = handler(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.parsed_messages, 1);
        assert_eq!(body.parser_failures, 1);
        assert!(body.last_parse_timestamp > 0);
    }
}
