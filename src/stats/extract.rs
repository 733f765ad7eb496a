//! Shape-specific extraction of observations from one record
//!
//! Extractors return `Err` when the whole record must be rejected and
//! `Ok(Extraction)` otherwise. A successful extraction may still carry
//! per-field errors for counters that could not be converted.

use crate::config::StatsConfig;
use crate::error::StatsError;
use crate::stats::classify::{Classification, RecordShape};
use crate::stats::sanitize::{sanitize, split_right};
use crate::stats::table::{Label, MetricMap};
use crate::stats::value::{coerce, truncate};
use serde_json::{Map, Value};

const VALUES_FIELD: &str = "values";
const SENDER_FIELD: &str = "sender";
const MESSAGES_FIELD: &str = "messages";

/// Observations extracted from one record plus the fields that were rejected
#[derive(Debug, Default)]
pub struct Extraction {
    pub batch: MetricMap,
    pub errors: Vec<StatsError>,
}

impl Extraction {
    fn push(&mut self, metric_name: &str, label: Label, value: f64) {
        self.batch
            .entry(sanitize(metric_name))
            .or_default()
            .insert(label, truncate(value));
    }

    /// Number of observations in the batch
    pub fn observation_count(&self) -> usize {
        self.batch.values().map(|values| values.len()).sum()
    }
}

/// Run the extractor matching `classification.shape`
pub fn extract(
    classification: &Classification,
    record: &Map<String, Value>,
    settings: &StatsConfig,
) -> Result<Extraction, StatsError> {
    let Classification {
        name,
        origin,
        shape,
    } = classification;
    let prefix = settings.metric_prefix.as_str();

    match shape {
        RecordShape::DynstatsGlobal => dynstats_global(prefix, name, origin, record),
        RecordShape::DynstatsBucket => dynstats_bucket(prefix, name, origin, record),
        RecordShape::SenderStat => sender_stat(prefix, record),
        RecordShape::NamedCounters => named_counters(prefix, name, origin, record, settings),
    }
}

fn values_object(record: &Map<String, Value>) -> Result<&Map<String, Value>, StatsError> {
    record
        .get(VALUES_FIELD)
        .and_then(Value::as_object)
        .ok_or_else(|| StatsError::MissingValuesObject {
            field: VALUES_FIELD.to_string(),
        })
}

// {"name":"global","origin":"dynstats","values":{"msg_per_facility.ops_overflow":1}}
// -> rsyslog_dynstats_global_ops_overflow{counter="msg_per_facility"} 1
fn dynstats_global(
    prefix: &str,
    name: &str,
    origin: &str,
    record: &Map<String, Value>,
) -> Result<Extraction, StatsError> {
    let mut extraction = Extraction::default();
    let metric_name = format!("{}_{}_{}", prefix, origin, name);

    for (field, value) in values_object(record)? {
        let Some((counter, subfield)) = split_right(field) else {
            extraction.errors.push(StatsError::InvalidCounterKey {
                field: field.clone(),
            });
            continue;
        };

        match coerce(field, value) {
            Ok(v) => extraction.push(
                &format!("{}_{}", metric_name, subfield),
                Label::new(Label::COUNTER, counter),
                v,
            ),
            Err(e) => extraction.errors.push(e),
        }
    }

    Ok(extraction)
}

// {"name":"msg_per_facility","origin":"dynstats.bucket","values":{"mail":1}}
// -> rsyslog_dynstats_bucket_msg_per_facility{bucket="mail"} 1
fn dynstats_bucket(
    prefix: &str,
    name: &str,
    origin: &str,
    record: &Map<String, Value>,
) -> Result<Extraction, StatsError> {
    let mut extraction = Extraction::default();
    let metric_name = format!("{}_{}_{}", prefix, origin, name);

    for (bucket, value) in values_object(record)? {
        match coerce(bucket, value) {
            Ok(v) => extraction.push(&metric_name, Label::new(Label::BUCKET, bucket.as_str()), v),
            Err(e) => extraction.errors.push(e),
        }
    }

    Ok(extraction)
}

/// Sender stats are all-or-nothing: any failure rejects the record
fn sender_stat(prefix: &str, record: &Map<String, Value>) -> Result<Extraction, StatsError> {
    let messages = coerce(
        MESSAGES_FIELD,
        record.get(MESSAGES_FIELD).unwrap_or(&Value::Null),
    )?;

    let sender = record
        .get(SENDER_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StatsError::MissingSenderField {
            field: SENDER_FIELD.to_string(),
        })?;

    let mut extraction = Extraction::default();
    extraction.push(
        &format!("{}_sender_stat_messages", prefix),
        Label::new(Label::SENDER, sender),
        messages,
    );

    Ok(extraction)
}

// {"name":"main Q","origin":"core.queue","size":1}
// -> rsyslog_core_queue_size{name="main Q"} 1
fn named_counters(
    prefix: &str,
    name: &str,
    origin: &str,
    record: &Map<String, Value>,
    settings: &StatsConfig,
) -> Result<Extraction, StatsError> {
    let mut extraction = Extraction::default();
    let metric_name = format!("{}_{}", prefix, origin);

    for (counter, value) in record {
        if *counter == settings.name_field || *counter == settings.origin_field {
            continue;
        }

        match coerce(counter, value) {
            Ok(v) => extraction.push(
                &format!("{}_{}", metric_name, counter),
                Label::new(Label::NAME, name),
                v,
            ),
            Err(e) => extraction.errors.push(e),
        }
    }

    Ok(extraction)
}
