//! Coercion of JSON scalars into observation values

use crate::error::StatsError;
use serde_json::Value;

/// Convert a JSON scalar into a number
///
/// Numbers pass through; strings are parsed as base-10 float literals.
/// Anything else is rejected with `InvalidValueType`.
pub fn coerce(field: &str, value: &Value) -> Result<f64, StatsError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| StatsError::InvalidNumericLiteral {
            field: field.to_string(),
            literal: n.to_string(),
        }),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| StatsError::InvalidNumericLiteral {
                field: field.to_string(),
                literal: s.clone(),
            }),
        other => Err(StatsError::InvalidValueType {
            field: field.to_string(),
            kind: kind_of(other),
        }),
    }
}

/// Stored observations are truncated toward zero, never rounded
pub fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
