// LogRelay - app/control.rs
//
// Inbound control messages and their dispatch.
//
// One topic carries everything: clients send `start-monitoring`,
// `stop-monitoring`, `query` and `download` messages; start/stop replies are
// published on the tail topic by the monitor itself (every subscriber sees
// them), while query results and downloads go back to the requester only.

use crate::app::monitor::TailMonitor;
use crate::app::query::{DownloadSummary, QueryService};
use crate::core::model::{QueryRequest, QueryResponse, TailEvent};
use crate::util::error::{ControlError, QueryError, QueryErrorKind};
use serde::Deserialize;
use std::sync::Arc;

/// Messages accepted from clients.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    StartMonitoring {
        #[serde(rename = "fileName", default)]
        file_name: String,
    },
    StopMonitoring,
    Query(QueryRequest),
    /// Whole file, or only the matching lines when a filter is set.
    Download(QueryRequest),
}

impl ControlMessage {
    /// Decode one JSON control message.
    pub fn from_json(text: &str) -> Result<Self, ControlError> {
        serde_json::from_str(text).map_err(|e| ControlError::Decode { source: e })
    }
}

/// What the caller should do with the outcome of a control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    /// Already published on the tail topic; nothing more to send.
    Published(TailEvent),
    /// A query result for the requester.
    QueryResult(QueryResponse),
    /// Download content for the requester.
    Download {
        file_name: String,
        summary: DownloadSummary,
        content: String,
    },
    /// The request was rejected; send the message to the requester.
    Rejected(String),
}

impl ControlReply {
    /// JSON rendering for a direct reply. `None` for `Published`, which has
    /// already gone out on the topic.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Published(_) => None,
            Self::QueryResult(resp) => {
                let mut value = serde_json::to_value(resp).ok()?;
                if let serde_json::Value::Object(map) = &mut value {
                    map.insert("type".to_string(), "query_result".into());
                }
                Some(value)
            }
            Self::Download {
                file_name,
                summary,
                content,
            } => Some(serde_json::json!({
                "type": "download_result",
                "fileName": file_name,
                "filtered": summary.filtered,
                "lines": summary.lines,
                "bytes": summary.bytes,
                "content": content,
            })),
            Self::Rejected(message) => Some(serde_json::json!({
                "type": "error",
                "message": message,
            })),
        }
    }
}

/// Routes control messages to the tail monitor and the query service.
pub struct ControlPlane {
    monitor: Arc<TailMonitor>,
    queries: QueryService,
}

impl ControlPlane {
    pub fn new(monitor: Arc<TailMonitor>, queries: QueryService) -> Self {
        Self { monitor, queries }
    }

    pub fn handle(&self, message: ControlMessage) -> ControlReply {
        match message {
            ControlMessage::StartMonitoring { file_name } => {
                ControlReply::Published(self.monitor.start(&file_name))
            }
            ControlMessage::StopMonitoring => ControlReply::Published(self.monitor.stop()),
            ControlMessage::Query(req) => match self.queries.query(&req) {
                Ok(resp) => ControlReply::QueryResult(resp),
                Err(e) => reject(&req, &e),
            },
            ControlMessage::Download(req) => {
                let mut buf = Vec::new();
                match self.queries.download(&req, &mut buf) {
                    Ok(summary) => ControlReply::Download {
                        file_name: req.file_name,
                        summary,
                        content: String::from_utf8_lossy(&buf).into_owned(),
                    },
                    Err(e) => reject(&req, &e),
                }
            }
        }
    }

    /// Decode and handle one JSON line. Malformed input becomes a
    /// `Rejected` reply rather than an error so a bad client line never
    /// ends the session.
    pub fn handle_json(&self, text: &str) -> ControlReply {
        match ControlMessage::from_json(text) {
            Ok(message) => self.handle(message),
            Err(e) => {
                tracing::warn!(error = %e, "Control: malformed message");
                ControlReply::Rejected(e.to_string())
            }
        }
    }
}

fn reject(req: &QueryRequest, e: &QueryError) -> ControlReply {
    match e.kind() {
        QueryErrorKind::Io => tracing::error!(file = %req.file_name, error = %e, "Request failed"),
        _ => tracing::warn!(file = %req.file_name, error = %e, "Request rejected"),
    }
    ControlReply::Rejected(e.to_string())
}
