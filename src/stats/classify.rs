//! Record shape detection
//!
//! Every impstats record declares a `name` and an `origin`. Together they decide
//! which extraction strategy applies to the rest of the record.

use crate::config::StatsConfig;
use crate::error::StatsError;
use serde_json::{Map, Value};

/// Record name used by `senders.keepTrack` statistics
pub const SENDER_STAT_NAME: &str = "_sender_stat";

/// Origins assumed for records that were emitted without an origin field
///
/// Only consulted when the origin field is absent.
const LEGACY_ORIGINS: &[(&str, &str)] = &[
    // omkafka before rsyslog 8.27 did not set an origin
    ("omkafka", "omkafka"),
    (SENDER_STAT_NAME, "impstats"),
];

/// Shape of a stats record, one extraction strategy per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `origin=dynstats`: compound `<counter>.<subfield>` keys under `values`
    DynstatsGlobal,
    /// `origin=dynstats.bucket`: one bucket per key under `values`
    DynstatsBucket,
    /// `name=_sender_stat`: per-sender message count
    SenderStat,
    /// Everything else: one metric per top-level counter, labeled by name
    NamedCounters,
}

impl RecordShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DynstatsGlobal => "dynstats_global",
            Self::DynstatsBucket => "dynstats_bucket",
            Self::SenderStat => "sender_stat",
            Self::NamedCounters => "named_counters",
        }
    }
}

/// Outcome of classifying one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub name: String,
    pub origin: String,
    pub shape: RecordShape,
}

/// Origin to assume for a record named `name` that carries no origin field
pub fn legacy_origin(name: &str) -> Option<&'static str> {
    LEGACY_ORIGINS
        .iter()
        .find(|(legacy_name, _)| *legacy_name == name)
        .map(|(_, origin)| *origin)
}

/// Determine name, origin and shape of a decoded record
///
/// A missing name is reported before a missing origin, so a record lacking
/// both yields a single `MissingNameField` error.
pub fn classify(
    record: &Map<String, Value>,
    settings: &StatsConfig,
) -> Result<Classification, StatsError> {
    let name = record
        .get(&settings.name_field)
        .and_then(Value::as_str)
        .ok_or_else(|| StatsError::MissingNameField {
            field: settings.name_field.clone(),
        })?;

    let origin = match record.get(&settings.origin_field).and_then(Value::as_str) {
        Some(origin) => origin,
        None => legacy_origin(name).ok_or_else(|| StatsError::MissingOriginField {
            field: settings.origin_field.clone(),
        })?,
    };

    let shape = match origin {
        "dynstats" => RecordShape::DynstatsGlobal,
        "dynstats.bucket" => RecordShape::DynstatsBucket,
        _ if name == SENDER_STAT_NAME => RecordShape::SenderStat,
        _ => RecordShape::NamedCounters,
    };

    Ok(Classification {
        name: name.to_string(),
        origin: origin.to_string(),
        shape,
    })
}
