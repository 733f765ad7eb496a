//! Error types for rsyslog-exporter
//!
//! `AppError` covers startup and serving failures and implements `IntoResponse`
//! for Axum handlers. `StatsError` is the per-record taxonomy of the stats
//! engine; those errors are logged and counted, never returned to a client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Failed to listen on {address}: {source}")]
    Listener {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Self::Listener { .. } => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            Self::Metrics(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Failures raised while turning one stats record into observations
///
/// Record-level variants abort the whole record. Field-level variants
/// (`InvalidValueType`, `InvalidNumericLiteral`, `InvalidCounterKey`) only drop
/// the offending field, except for sender stats which are all-or-nothing.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("cannot parse JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("'{field}' field is required but not found")]
    MissingNameField { field: String },

    #[error("'{field}' field is required but not found")]
    MissingOriginField { field: String },

    #[error("'{field}' field is required to be an object but not found")]
    MissingValuesObject { field: String },

    #[error("'{field}' field is required to be a string but not found")]
    MissingSenderField { field: String },

    #[error("field '{field}': cannot convert {kind} to a number")]
    InvalidValueType { field: String, kind: &'static str },

    #[error("field '{field}': invalid numeric literal '{literal}'")]
    InvalidNumericLiteral { field: String, literal: String },

    #[error("counter key '{field}' has no '.' separating counter and sub-field")]
    InvalidCounterKey { field: String },

    #[error("malformed syslog message: {0}")]
    Framing(String),
}

impl StatsError {
    /// True when the error only invalidates a single field of a record
    pub fn is_field_level(&self) -> bool {
        matches!(
            self,
            Self::InvalidValueType { .. }
                | Self::InvalidNumericLiteral { .. }
                | Self::InvalidCounterKey { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_failed_mentions_path() {
        let err = AppError::ConfigValidationFailed {
            path: "exporter.toml".to_string(),
            reason: "bad prefix".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exporter.toml"));
        assert!(msg.contains("bad prefix"));
    }

    #[test]
    fn test_config_error_response_status() {
        let err = AppError::Config("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_metrics_error_response_status() {
        let err = AppError::Metrics(prometheus::Error::Msg("encoder".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_listener_error_response_status() {
        let err = AppError::Listener {
            address: "udp://0.0.0.0:5145".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_missing_name_field_message() {
        let err = StatsError::MissingNameField {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "'name' field is required but not found");
        assert!(!err.is_field_level());
    }

    #[test]
    fn test_value_errors_are_field_level() {
        let err = StatsError::InvalidValueType {
            field: "size".to_string(),
            kind: "boolean",
        };
        assert!(err.is_field_level());
        assert_eq!(err.to_string(), "field 'size': cannot convert boolean to a number");

        let err = StatsError::InvalidNumericLiteral {
            field: "size".to_string(),
            literal: "1.2.3".to_string(),
        };
        assert!(err.is_field_level());
    }

    #[test]
    fn test_decode_error_wraps_serde_json() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StatsError::from(source);
        assert!(err.to_string().starts_with("cannot parse JSON"));
    }
}
