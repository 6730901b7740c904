// LogRelay - core/parser.rs
//
// Line parser for the recognised log-line grammar:
//
//   yyyy-MM-dd HH:mm:ss.SSS <spaces> LEVEL <spaces> message...
//
// Core layer: pure function over a single line, never touches the filesystem
// and never fails. Lines that do not match are kept verbatim.

use crate::core::model::LogLine;
use crate::util::constants;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// The compiled grammar. The pattern is a compile-time constant, so a failure
/// here can only be a programming error caught by the tests below.
fn line_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(constants::LOG_LINE_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(error = %e, "Log line pattern failed to compile");
                None
            }
        })
        .as_ref()
}

/// Parse one raw line (without its trailing newline).
///
/// On a grammar match the level and message are always set; the timestamp is
/// `None` when the captured text is not a valid calendar value (e.g. month 13).
pub fn parse_line(raw: &str) -> LogLine {
    let Some(caps) = line_pattern().and_then(|re| re.captures(raw)) else {
        return LogLine::unparsed(raw);
    };

    let raw_ts = caps.get(1).map_or("", |m| m.as_str());
    let level = caps.get(2).map_or("", |m| m.as_str());
    let message = caps.get(3).map_or("", |m| m.as_str());

    LogLine::parsed(raw, parse_timestamp(raw_ts), level, message)
}

/// Parse the grammar's timestamp text. Returns `None` for malformed values.
pub fn parse_timestamp(raw_ts: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw_ts, constants::LOG_LINE_TIMESTAMP_FORMAT).ok()
}

/// Split decoded text into lines on `\n`, stripping one trailing `\r` from
/// each. Blank lines are dropped.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}
