//! Syslog header stripping
//!
//! Only the message content matters to the exporter, so headers are validated
//! just enough to find where the content starts.

use super::SyslogFormat;
use crate::error::StatsError;

const BOM: char = '\u{feff}';

/// Return the content (MSG part) of a raw syslog message
pub fn extract_content(format: SyslogFormat, raw: &str) -> Result<&str, StatsError> {
    let raw = raw.trim_end_matches(['\r', '\n']);
    let rest = strip_priority(raw)?;

    let content = match format {
        SyslogFormat::Rfc3164 => rfc3164_content(rest),
        SyslogFormat::Rfc5424 => rfc5424_content(rest)?,
    };

    if content.is_empty() {
        return Err(StatsError::Framing("message has no content".to_string()));
    }
    Ok(content)
}

fn strip_priority(raw: &str) -> Result<&str, StatsError> {
    let rest = raw
        .strip_prefix('<')
        .ok_or_else(|| StatsError::Framing("missing <PRI> header".to_string()))?;
    let end = rest
        .find('>')
        .ok_or_else(|| StatsError::Framing("unterminated <PRI> header".to_string()))?;
    let pri = &rest[..end];

    if pri.is_empty() || pri.len() > 3 || !pri.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StatsError::Framing(format!("invalid priority '{}'", pri)));
    }
    Ok(&rest[end + 1..])
}

/// Split off the next space-delimited token
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start_matches(' ');
    if s.is_empty() {
        return None;
    }
    match s.find(' ') {
        Some(i) => Some((&s[..i], &s[i + 1..])),
        None => Some((s, "")),
    }
}

fn rfc3164_content(rest: &str) -> &str {
    // "Mmm dd hh:mm:ss" is 15 bytes, with the day padded by a space
    let after_timestamp = if rest.len() > 15
        && rest.is_char_boundary(15)
        && rest.as_bytes()[15] == b' '
        && rest.as_bytes()[..3].iter().all(u8::is_ascii_alphabetic)
    {
        &rest[16..]
    } else {
        // high-precision timestamps are a single token
        match next_token(rest) {
            Some((_, tail)) => tail,
            None => return "",
        }
    };

    let after_host = match next_token(after_timestamp) {
        Some((_, tail)) => tail,
        None => return "",
    };

    strip_tag(after_host.trim_start_matches(' '))
}

/// Drop a leading `TAG:` or `TAG[PID]:` if present
fn strip_tag(s: &str) -> &str {
    let is_tag_char =
        |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '[' | ']');

    match s.find(|c: char| !is_tag_char(c)) {
        Some(i) if i > 0 && s[i..].starts_with(':') => s[i + 1..].trim_start_matches(' '),
        _ => s,
    }
}

fn rfc5424_content(rest: &str) -> Result<&str, StatsError> {
    let malformed = |what: &str| StatsError::Framing(format!("RFC5424 header is missing {}", what));

    let (version, rest) = next_token(rest).ok_or_else(|| malformed("VERSION"))?;
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StatsError::Framing(format!("invalid RFC5424 version '{}'", version)));
    }

    let mut rest = rest;
    for field in ["TIMESTAMP", "HOSTNAME", "APP-NAME", "PROCID", "MSGID"] {
        let (_, tail) = next_token(rest).ok_or_else(|| malformed(field))?;
        rest = tail;
    }

    let msg = skip_structured_data(rest)?;
    let msg = msg.strip_prefix(' ').unwrap_or(msg);
    Ok(msg.strip_prefix(BOM).unwrap_or(msg))
}

fn skip_structured_data(s: &str) -> Result<&str, StatsError> {
    if let Some(rest) = s.strip_prefix('-') {
        return Ok(rest);
    }
    if !s.starts_with('[') {
        return Err(StatsError::Framing(
            "RFC5424 header is missing STRUCTURED-DATA".to_string(),
        ));
    }

    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => depth += 1,
            ']' if !in_quotes => {
                depth = depth.saturating_sub(1);
                let next = &s[i + 1..];
                if depth == 0 && !next.starts_with('[') {
                    return Ok(next);
                }
            }
            _ => {}
        }
    }

    Err(StatsError::Framing(
        "unterminated RFC5424 STRUCTURED-DATA".to_string(),
    ))
}
