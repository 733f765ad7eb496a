//! Prometheus exposition of the stats table
//!
//! `StatsCollector` converts a point-in-time snapshot of the parser state into
//! metric families on every scrape. Table metrics carry exactly one label whose
//! name is the observation's label axis (`name`, `counter`, `bucket` or
//! `sender`). Three exporter-internal counters are always exposed:
//!
//! - `rsyslog_exporter_parser_failures`
//! - `rsyslog_exporter_parsed_messages`
//! - `rsyslog_exporter_parse_timestamp`

use crate::stats::{LabeledValues, RsyslogStats, StatsSnapshot};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;

pub const PARSER_FAILURES: &str = "rsyslog_exporter_parser_failures";
pub const PARSED_MESSAGES: &str = "rsyslog_exporter_parsed_messages";
pub const PARSE_TIMESTAMP: &str = "rsyslog_exporter_parse_timestamp";

const INTERNAL_METRICS: &[&str] = &[PARSER_FAILURES, PARSED_MESSAGES, PARSE_TIMESTAMP];

const PARSER_FAILURES_HELP: &str = "Amount of rsyslog stats parsing failures";
const PARSED_MESSAGES_HELP: &str = "Amount of rsyslog stat messages parsed";
const PARSE_TIMESTAMP_HELP: &str = "Latest parse Unix timestamp";

/// Metric suffixes (after the prefix) that describe a level rather than a total
const GAUGE_SUFFIXES: &[&str] = &["core_queue_size"];

/// Exposition type of a table metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Custom collector reading the shared stats table at scrape time
pub struct StatsCollector {
    stats: Arc<RsyslogStats>,
    gauge_names: Vec<String>,
    descs: Vec<Desc>,
}

impl StatsCollector {
    pub fn new(stats: Arc<RsyslogStats>) -> Result<Self, prometheus::Error> {
        let prefix = stats.settings().metric_prefix.clone();
        let gauge_names = GAUGE_SUFFIXES
            .iter()
            .map(|suffix| format!("{}_{}", prefix, suffix))
            .collect();

        let descs = [
            (PARSER_FAILURES, PARSER_FAILURES_HELP),
            (PARSED_MESSAGES, PARSED_MESSAGES_HELP),
            (PARSE_TIMESTAMP, PARSE_TIMESTAMP_HELP),
        ]
        .into_iter()
        .map(|(name, help)| Desc::new(name.to_string(), help.to_string(), vec![], HashMap::new()))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            stats,
            gauge_names,
            descs,
        })
    }

    /// How a table metric is exposed
    ///
    /// Prometheus counters cannot go negative, so a metric with any negative
    /// sample falls back to a gauge.
    pub fn kind_of(&self, metric: &str, values: &LabeledValues) -> MetricKind {
        if self.gauge_names.iter().any(|name| name == metric) || values.values().any(|v| *v < 0) {
            MetricKind::Gauge
        } else {
            MetricKind::Counter
        }
    }

    fn table_family(
        &self,
        metric: &str,
        values: &LabeledValues,
    ) -> Result<Vec<MetricFamily>, prometheus::Error> {
        // every label of one metric shares the axis of the shape that produced it
        let Some(axis) = values.keys().map(|label| label.axis()).min() else {
            return Ok(Vec::new());
        };
        let opts = Opts::new(metric, format!("rsyslog impstats {} labeled by {}", metric, axis));
        let samples = values.iter().filter(|(label, _)| {
            if label.axis() != axis {
                tracing::debug!(
                    metric,
                    axis = label.axis(),
                    expected_axis = axis,
                    "Skipping sample with conflicting label axis"
                );
                return false;
            }
            true
        });

        match self.kind_of(metric, values) {
            MetricKind::Gauge => {
                let vec = IntGaugeVec::new(opts, &[axis])?;
                for (label, value) in samples {
                    vec.get_metric_with_label_values(&[label.value()])?.set(*value);
                }
                Ok(vec.collect())
            }
            MetricKind::Counter => {
                let vec = IntCounterVec::new(opts, &[axis])?;
                for (label, value) in samples {
                    vec.get_metric_with_label_values(&[label.value()])?
                        .inc_by(*value as u64);
                }
                Ok(vec.collect())
            }
        }
    }

    fn internal_families(
        &self,
        snapshot: &StatsSnapshot,
    ) -> Result<Vec<MetricFamily>, prometheus::Error> {
        let failures = IntCounter::with_opts(Opts::new(PARSER_FAILURES, PARSER_FAILURES_HELP))?;
        failures.inc_by(snapshot.parser_failures);

        let parsed = IntCounter::with_opts(Opts::new(PARSED_MESSAGES, PARSED_MESSAGES_HELP))?;
        parsed.inc_by(snapshot.parsed_messages);

        let timestamp = IntCounter::with_opts(Opts::new(PARSE_TIMESTAMP, PARSE_TIMESTAMP_HELP))?;
        timestamp.inc_by(snapshot.parse_timestamp.max(0) as u64);

        let mut families = failures.collect();
        families.extend(parsed.collect());
        families.extend(timestamp.collect());
        Ok(families)
    }
}

impl Collector for StatsCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self.stats.snapshot();
        let mut families = Vec::with_capacity(snapshot.metrics.len() + 3);

        let mut names: Vec<&String> = snapshot.metrics.keys().collect();
        names.sort();

        for name in names {
            if INTERNAL_METRICS.contains(&name.as_str()) {
                tracing::debug!(
                    metric = %name,
                    "Skipping stats metric that collides with an exporter metric"
                );
                continue;
            }
            match self.table_family(name, &snapshot.metrics[name]) {
                Ok(family) => families.extend(family),
                Err(e) => {
                    tracing::error!(metric = %name, error = %e, "Failed to build metric family");
                }
            }
        }

        match self.internal_families(&snapshot) {
            Ok(internal) => families.extend(internal),
            Err(e) => tracing::error!(error = %e, "Failed to build exporter metrics"),
        }

        families
    }
}

/// Prometheus registry serving the `/metrics` endpoint
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create a registry exposing `stats`
    ///
    /// # Errors
    ///
    /// Returns an error if collector registration fails.
    pub fn new(stats: Arc<RsyslogStats>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        registry.register(Box::new(StatsCollector::new(stats)?))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            let metric_names: Vec<_> = metric_families.iter().map(|mf| mf.name()).collect();

            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                metric_names = ?metric_names,
                "Prometheus text encoder failed"
            );

            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}. Metrics: {:?}",
                metric_count, e, metric_names
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            let valid_up_to = e.utf8_error().valid_up_to();
            tracing::error!(
                invalid_byte_index = valid_up_to,
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                valid_up_to, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Label;

    fn stats_with(lines: &[&str]) -> Arc<RsyslogStats> {
        let stats = Arc::new(RsyslogStats::default());
        for line in lines {
            stats.parse(line).expect("test line should parse");
        }
        stats
    }

    #[test]
    fn test_internal_metrics_always_present() {
        let metrics = Metrics::new(Arc::new(RsyslogStats::default())).unwrap();
        let output = metrics.gather().unwrap();

        assert!(output.contains("rsyslog_exporter_parser_failures 0"));
        assert!(output.contains("rsyslog_exporter_parsed_messages 0"));
        assert!(output.contains("rsyslog_exporter_parse_timestamp 0"));
    }

    #[test]
    fn test_table_metrics_exposed_with_axis_label() {
        let stats = stats_with(&[
            r#"{"name": "stats", "origin": "core.queue", "size": 1, "enqueued": 42}"#,
            r#"{"name": "msg_per_facility", "origin": "dynstats.bucket", "values": {"mail": 3}}"#,
        ]);
        let output = Metrics::new(stats).unwrap().gather().unwrap();

        assert!(output.contains(r#"rsyslog_core_queue_enqueued{name="stats"} 42"#), "{}", output);
        assert!(output.contains(r#"rsyslog_core_queue_size{name="stats"} 1"#), "{}", output);
        assert!(output.contains(r#"rsyslog_dynstats_bucket_msg_per_facility{bucket="mail"} 3"#));
        assert!(output.contains("rsyslog_exporter_parsed_messages 2"));
    }

    #[test]
    fn test_queue_size_is_a_gauge() {
        let stats = stats_with(&[r#"{"name": "main Q", "origin": "core.queue", "size": 4, "full": 0}"#]);
        let output = Metrics::new(stats).unwrap().gather().unwrap();

        assert!(output.contains("# TYPE rsyslog_core_queue_size gauge"));
        assert!(output.contains("# TYPE rsyslog_core_queue_full counter"));
    }

    #[test]
    fn test_negative_values_fall_back_to_gauge() {
        let stats = Arc::new(RsyslogStats::default());
        let collector = StatsCollector::new(Arc::clone(&stats)).unwrap();

        let mut values = LabeledValues::new();
        values.insert(Label::new(Label::NAME, "x"), -3);
        assert_eq!(collector.kind_of("rsyslog_custom_delta", &values), MetricKind::Gauge);

        values.insert(Label::new(Label::NAME, "x"), 3);
        assert_eq!(collector.kind_of("rsyslog_custom_delta", &values), MetricKind::Counter);
        assert_eq!(collector.kind_of("rsyslog_core_queue_size", &values), MetricKind::Gauge);
    }

    #[test]
    fn test_collector_reports_failures() {
        let stats = Arc::new(RsyslogStats::default());
        let _ = stats.parse("not json");
        let output = Metrics::new(stats).unwrap().gather().unwrap();
        assert!(output.contains("rsyslog_exporter_parser_failures 1"));
    }

    #[test]
    fn test_label_values_are_escaped_not_sanitized() {
        let stats = stats_with(&[r#"{"name": "action \"fwd\" Q", "origin": "core.queue", "enqueued": 1}"#]);
        let output = Metrics::new(stats).unwrap().gather().unwrap();
        assert!(output.contains(r#"rsyslog_core_queue_enqueued{name="action \"fwd\" Q"} 1"#), "{}", output);
    }

    #[test]
    fn test_records_cannot_shadow_exporter_metrics() {
        let stats = stats_with(&[
            r#"{"name": "x", "origin": "exporter", "parsed_messages": 999, "parser_failures": 5}"#,
            r#"{"name": "x", "origin": "exporter", "queue": 3}"#,
        ]);
        let output = Metrics::new(stats).unwrap().gather().unwrap();

        assert!(output.contains("rsyslog_exporter_parsed_messages 2"), "{}", output);
        assert!(output.contains("rsyslog_exporter_parser_failures 0"), "{}", output);
        assert!(!output.contains(r#"rsyslog_exporter_parsed_messages{name="x"}"#), "{}", output);
        assert!(!output.contains(r#"rsyslog_exporter_parser_failures{name="x"}"#), "{}", output);
        assert!(output.contains(&format!("# HELP {} {}", PARSED_MESSAGES, PARSED_MESSAGES_HELP)));
        // unrelated metrics under the same origin are still exposed
        assert!(output.contains(r#"rsyslog_exporter_queue{name="x"} 3"#), "{}", output);
    }

    #[test]
    fn test_metrics_is_clonable() {
        let metrics = Metrics::new(Arc::new(RsyslogStats::default())).unwrap();
        let cloned = metrics.clone();
        assert!(cloned.gather().unwrap().contains(PARSED_MESSAGES));
    }
}
