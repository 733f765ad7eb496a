//! Latest-value metric table
//!
//! Maps a sanitized metric name to the set of labeled observations seen for it.
//! Every merge overwrites per (name, label) key; nothing accumulates and labels
//! that stop being reported are kept until restart.

use std::collections::HashMap;

/// The single label attached to an observation, e.g. `{name="main Q"}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    axis: &'static str,
    value: String,
}

impl Label {
    pub const NAME: &'static str = "name";
    pub const COUNTER: &'static str = "counter";
    pub const BUCKET: &'static str = "bucket";
    pub const SENDER: &'static str = "sender";

    pub fn new(axis: &'static str, value: impl Into<String>) -> Self {
        Self {
            axis,
            value: value.into(),
        }
    }

    /// Label name as exposed to Prometheus
    pub fn axis(&self) -> &'static str {
        self.axis
    }

    /// Label value, kept verbatim
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Observations for one metric name keyed by label
pub type LabeledValues = HashMap<Label, i64>;

/// Metric name → labeled observations
///
/// Used both for the extraction batch of a single record and for the
/// accumulated table.
pub type MetricMap = HashMap<String, LabeledValues>;

/// Accumulated observations across all parsed records
#[derive(Debug, Default)]
pub struct MetricTable {
    metrics: MetricMap,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite every observation of `batch`
    pub fn merge(&mut self, batch: MetricMap) {
        for (metric, values) in batch {
            self.metrics.entry(metric).or_default().extend(values);
        }
    }

    /// Owned copy of the current table
    pub fn snapshot(&self) -> MetricMap {
        self.metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: &[(&str, &'static str, &str, i64)]) -> MetricMap {
        let mut m = MetricMap::new();
        for (metric, axis, value, v) in entries {
            m.entry(metric.to_string())
                .or_default()
                .insert(Label::new(*axis, *value), *v);
        }
        m
    }

    #[test]
    fn test_merge_disjoint_batches_is_union() {
        let mut table = MetricTable::new();
        table.merge(batch(&[
            ("rsyslog_test_123", Label::NAME, "t123.1", 1),
            ("rsyslog_test_123", Label::NAME, "t123.2", 2),
        ]));
        table.merge(batch(&[("rsyslog_test_345", Label::NAME, "t345", 3)]));

        let expected = batch(&[
            ("rsyslog_test_123", Label::NAME, "t123.1", 1),
            ("rsyslog_test_123", Label::NAME, "t123.2", 2),
            ("rsyslog_test_345", Label::NAME, "t345", 3),
        ]);
        assert_eq!(table.snapshot(), expected);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_merge_same_key_last_write_wins() {
        let mut table = MetricTable::new();
        table.merge(batch(&[("rsyslog_core_queue_size", Label::NAME, "main Q", 10)]));
        table.merge(batch(&[("rsyslog_core_queue_size", Label::NAME, "main Q", 3)]));

        let snapshot = table.snapshot();
        assert_eq!(
            snapshot["rsyslog_core_queue_size"][&Label::new(Label::NAME, "main Q")],
            3
        );
    }

    #[test]
    fn test_merge_keeps_stale_labels() {
        // A label missing from a later record is not evicted
        let mut table = MetricTable::new();
        table.merge(batch(&[
            ("rsyslog_core_queue_size", Label::NAME, "main Q", 1),
            ("rsyslog_core_queue_size", Label::NAME, "action Q", 2),
        ]));
        table.merge(batch(&[("rsyslog_core_queue_size", Label::NAME, "main Q", 5)]));

        let snapshot = table.snapshot();
        let values = &snapshot["rsyslog_core_queue_size"];
        assert_eq!(values.len(), 2);
        assert_eq!(values[&Label::new(Label::NAME, "action Q")], 2);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut table = MetricTable::new();
        table.merge(batch(&[("m", Label::BUCKET, "mail", 1)]));
        let before = table.snapshot();
        table.merge(batch(&[("m", Label::BUCKET, "mail", 2)]));

        assert_eq!(before["m"][&Label::new(Label::BUCKET, "mail")], 1);
        assert!(!table.is_empty());
    }
}
