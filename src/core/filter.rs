// LogRelay - core/filter.rs
//
// Filter engine for the point-in-time query path.
// All active predicates are AND-combined. A line is only excluded by a
// predicate whose field it actually has; a line without a timestamp is never
// excluded by a time window, and a line without a level never by a level.
// Core layer: pure logic, no I/O.

use crate::core::model::{FilterSpec, LogLine};
use crate::core::parser;

/// Apply `spec` to raw lines, returning the surviving lines as their original
/// text in original order.
///
/// An empty spec is a pass-through: the input is returned untouched without
/// parsing a single line.
pub fn filter_lines(lines: Vec<String>, spec: &FilterSpec) -> Vec<String> {
    if spec.is_empty() {
        return lines;
    }

    let keyword_lower = spec.keyword().map(str::to_lowercase);

    lines
        .into_iter()
        .filter(|raw| matches_all(&parser::parse_line(raw), spec, keyword_lower.as_deref()))
        .collect()
}

/// Check a single parsed line against every active predicate.
///
/// `keyword_lower` is the pre-lowercased keyword so it is not recomputed per
/// line.
pub fn matches_all(line: &LogLine, spec: &FilterSpec, keyword_lower: Option<&str>) -> bool {
    // Time window (only applies to lines that carry a timestamp)
    if let Some(ts) = line.timestamp() {
        if let Some(start) = spec.start_time {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = spec.end_time {
            if ts > end {
                return false;
            }
        }
    }

    // Level (only applies to lines that carry a level)
    if let (Some(wanted), Some(actual)) = (spec.level(), line.level()) {
        if !actual.eq_ignore_ascii_case(wanted.trim()) {
            return false;
        }
    }

    // Keyword against the raw text
    if let Some(keyword) = keyword_lower {
        if !line.raw().to_lowercase().contains(keyword) {
            return false;
        }
    }

    true
}
