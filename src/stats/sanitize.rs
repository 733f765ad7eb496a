//! Metric name normalization helpers

/// Turn arbitrary text into a Prometheus-safe metric name token
///
/// Lowercases the input, replaces every character outside `[a-z0-9_]` with an
/// underscore, collapses underscore runs and strips trailing underscores.
///
/// ```
/// use rsyslog_exporter::stats::sanitize::sanitize;
///
/// assert_eq!(sanitize("Core.Queue"), "core_queue");
/// assert_eq!(sanitize("a1!@#b2"), "a1_b2");
/// ```
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        let c = c.to_ascii_lowercase();
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };

        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    while out.ends_with('_') {
        out.pop();
    }

    out
}

/// Split a dynstats counter key at its last `.`
///
/// Returns `None` when the key has no `.` at all.
pub fn split_right(text: &str) -> Option<(&str, &str)> {
    text.rfind('.').map(|i| (&text[..i], &text[i + 1..]))
}
