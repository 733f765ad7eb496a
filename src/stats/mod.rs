//! rsyslog impstats parsing engine
//!
//! Turns one JSON stats line into labeled observations and merges them into a
//! process-wide latest-value table.
//!
//! # Concurrency
//!
//! The table and the parse counters live behind a single `RwLock`. Parsing
//! holds the write lock only while committing one record's batch together with
//! its bookkeeping, and `snapshot()` copies everything under one read lock, so
//! a reader sees either all or none of a record's update.

pub mod classify;
pub mod extract;
pub mod sanitize;
pub mod table;
pub mod value;

pub use classify::{Classification, RecordShape};
pub use extract::Extraction;
pub use table::{Label, LabeledValues, MetricMap, MetricTable};

use crate::config::StatsConfig;
use crate::error::StatsError;
use serde_json::{Map, Value};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Mutable parser state guarded by the stats lock
#[derive(Debug, Default)]
struct ParserState {
    table: MetricTable,
    parser_failures: u64,
    parsed_messages: u64,
    parse_timestamp: i64,
}

/// Point-in-time copy of the parser state
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub metrics: MetricMap,
    pub parser_failures: u64,
    pub parsed_messages: u64,
    /// Unix timestamp (seconds) of the latest successfully parsed record, 0 if none
    pub parse_timestamp: i64,
}

/// Summary of a record that was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseReport {
    pub shape: RecordShape,
    pub observations: usize,
    pub rejected_fields: usize,
}

/// Parser state shared between the ingest task and metrics scrapes
#[derive(Debug)]
pub struct RsyslogStats {
    settings: StatsConfig,
    state: RwLock<ParserState>,
}

impl Default for RsyslogStats {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}

impl RsyslogStats {
    pub fn new(settings: StatsConfig) -> Self {
        Self {
            settings,
            state: RwLock::new(ParserState::default()),
        }
    }

    pub fn settings(&self) -> &StatsConfig {
        &self.settings
    }

    /// Parse one stats line and merge its observations
    ///
    /// Record-level failures leave the table and timestamp untouched and count
    /// one failure. Rejected fields of an otherwise valid record are counted
    /// individually while the rest of the record is still merged.
    pub fn parse(&self, line: &str) -> Result<ParseReport, StatsError> {
        let (classification, extraction) = match self.decode_and_extract(line) {
            Ok(extracted) => extracted,
            Err(e) => {
                self.record_failure(&e, line);
                return Err(e);
            }
        };

        for e in &extraction.errors {
            log_failure(e, line);
        }

        let report = ParseReport {
            shape: classification.shape,
            observations: extraction.observation_count(),
            rejected_fields: extraction.errors.len(),
        };

        {
            let mut state = self.write();
            state.table.merge(extraction.batch);
            state.parser_failures += extraction.errors.len() as u64;
            state.parsed_messages += 1;
            state.parse_timestamp = unix_timestamp();
        }

        tracing::debug!(
            name = %classification.name,
            origin = %classification.origin,
            shape = classification.shape.as_str(),
            observations = report.observations,
            rejected_fields = report.rejected_fields,
            "Parsed rsyslog stats record"
        );

        Ok(report)
    }

    fn decode_and_extract(&self, line: &str) -> Result<(Classification, Extraction), StatsError> {
        let record: Map<String, Value> = serde_json::from_str(line)?;
        let classification = classify::classify(&record, &self.settings)?;
        let extraction = extract::extract(&classification, &record, &self.settings)?;
        Ok((classification, extraction))
    }

    /// Count and log a failure that happened before a record could be parsed
    pub fn record_failure(&self, error: &StatsError, source: &str) {
        log_failure(error, source);
        self.write().parser_failures += 1;
    }

    /// Merge an already extracted batch into the table
    pub fn merge(&self, batch: MetricMap) {
        self.write().table.merge(batch);
    }

    /// Copy of the table and counters taken under a single read lock
    pub fn snapshot(&self) -> StatsSnapshot {
        let state = self.read();
        StatsSnapshot {
            metrics: state.table.snapshot(),
            parser_failures: state.parser_failures,
            parsed_messages: state.parsed_messages,
            parse_timestamp: state.parse_timestamp,
        }
    }

    pub fn parser_failures(&self) -> u64 {
        self.read().parser_failures
    }

    pub fn parsed_messages(&self) -> u64 {
        self.read().parsed_messages
    }

    pub fn parse_timestamp(&self) -> i64 {
        self.read().parse_timestamp
    }

    // A panic while holding the lock cannot leave the counters half-updated,
    // so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, ParserState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ParserState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_failure(error: &StatsError, source: &str) {
    if error.is_field_level() {
        tracing::warn!(error = %error, json = %source, "Rejected rsyslog stats field");
    } else {
        tracing::warn!(error = %error, json = %source, "Failed to parse rsyslog stats record");
    }
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
