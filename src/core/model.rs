// LogRelay - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies.
//
// These types are the shared vocabulary across all layers: the parser
// produces `LogLine`s, the filter consumes `FilterSpec`s, the tail monitor
// emits `TailEvent`s, and the query service speaks `QueryRequest` /
// `QueryResponse`.

use crate::util::constants;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Log Line (output of parsing)
// =============================================================================

/// A single log line, structured when it matches the recognised grammar.
///
/// `timestamp`, `level` and `message` are only present when `raw` matched the
/// grammar. `raw` is always the exact original text; nothing is ever
/// reconstructed from the structured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    timestamp: Option<NaiveDateTime>,
    level: Option<String>,
    message: Option<String>,
    raw: String,
}

impl LogLine {
    /// A line that did not match the grammar.
    pub fn unparsed(raw: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            level: None,
            message: None,
            raw: raw.into(),
        }
    }

    /// A line that matched the grammar. `timestamp` is `None` when the
    /// captured text was not a valid calendar value.
    pub fn parsed(
        raw: impl Into<String>,
        timestamp: Option<NaiveDateTime>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level: Some(level.into()),
            message: Some(message.into()),
            raw: raw.into(),
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// ISO-8601 rendering of the timestamp, or an empty string.
    /// A zero fractional part is omitted (`2024-01-01T00:00:00`).
    pub fn iso_timestamp(&self) -> String {
        self.timestamp
            .map(|ts| ts.format(constants::WIRE_TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default()
    }
}

// =============================================================================
// Filter specification
// =============================================================================

/// Predicate inputs for the point-in-time query path. All set fields are
/// AND-combined. Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Case-insensitive substring matched against the raw line.
    pub keyword: Option<String>,

    /// Case-insensitive exact match against the parsed level.
    pub level: Option<String>,

    /// Inclusive lower bound on the parsed timestamp.
    pub start_time: Option<NaiveDateTime>,

    /// Inclusive upper bound on the parsed timestamp.
    pub end_time: Option<NaiveDateTime>,
}

impl FilterSpec {
    /// The keyword, if set and non-blank.
    pub fn keyword(&self) -> Option<&str> {
        non_blank(self.keyword.as_deref())
    }

    /// The level, if set and non-blank.
    pub fn level(&self) -> Option<&str> {
        non_blank(self.level.as_deref())
    }

    /// Returns true if no filter field is active.
    pub fn is_empty(&self) -> bool {
        self.keyword().is_none()
            && self.level().is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

// =============================================================================
// Tail events (outbound protocol)
// =============================================================================

/// Messages published on the live-tail topic. Control replies and data share
/// one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// `start` accepted.
    MonitoringStarted { file_name: String, message: String },

    /// A control request was rejected.
    Error { message: String },

    /// The first effective `stop`.
    MonitoringStopped { message: String },

    /// Any `stop` after the first.
    MonitoringAlreadyStopped { message: String },

    /// A line appended to the monitored file.
    NewLogLine { file_name: String, line: LogLine },
}

impl TailEvent {
    /// Wire value of the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::MonitoringStarted { .. } => "monitoring_started",
            Self::Error { .. } => "error",
            Self::MonitoringStopped { .. } => "monitoring_stopped",
            Self::MonitoringAlreadyStopped { .. } => "monitoring_already_stopped",
            Self::NewLogLine { .. } => "new_log_line",
        }
    }
}

impl Serialize for TailEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.type_name())?;
        match self {
            Self::MonitoringStarted { file_name, message } => {
                map.serialize_entry("fileName", file_name)?;
                map.serialize_entry("message", message)?;
            }
            Self::Error { message }
            | Self::MonitoringStopped { message }
            | Self::MonitoringAlreadyStopped { message } => {
                map.serialize_entry("message", message)?;
            }
            Self::NewLogLine { file_name, line } => {
                map.serialize_entry("fileName", file_name)?;
                map.serialize_entry("content", line.raw())?;
                map.serialize_entry("timestamp", &line.iso_timestamp())?;
                map.serialize_entry("level", line.level().unwrap_or(""))?;
                map.serialize_entry("rawContent", line.message().unwrap_or(line.raw()))?;
            }
        }
        map.end()
    }
}

// =============================================================================
// Point-in-time query DTOs
// =============================================================================

/// A filtered, paginated read of one log file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub file_name: String,

    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub keyword: Option<String>,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default, deserialize_with = "deserialize_query_time")]
    pub start_time: Option<NaiveDateTime>,

    #[serde(default, deserialize_with = "deserialize_query_time")]
    pub end_time: Option<NaiveDateTime>,

    /// Newest lines first when true.
    #[serde(default = "default_reverse")]
    pub reverse: bool,
}

impl QueryRequest {
    /// A request for `file_name` with every other field at its default.
    pub fn for_file(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            page: default_page(),
            page_size: default_page_size(),
            keyword: None,
            level: None,
            start_time: None,
            end_time: None,
            reverse: default_reverse(),
        }
    }

    /// The filter fields of this request.
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            keyword: self.keyword.clone(),
            level: self.level.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

fn default_page() -> usize {
    constants::DEFAULT_PAGE
}

fn default_page_size() -> usize {
    constants::DEFAULT_PAGE_SIZE
}

fn default_reverse() -> bool {
    true
}

/// Parse a query time bound in any of the accepted formats.
pub fn parse_query_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    constants::QUERY_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn deserialize_query_time<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_query_time(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised time '{s}'"))),
    }
}

/// One page of a filtered log file plus file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub lines: Vec<String>,
    pub total_lines: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub file_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}
