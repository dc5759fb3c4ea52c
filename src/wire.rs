use crate::record::{Fields, LogEntry};
use chrono::SecondsFormat;
use serde::Serialize;
use tracing::warn;

/// MIME type of the payload produced by [`encode_batch`].
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// One line of the VictoriaLogs `jsonline` payload.
///
/// `_msg` and `_time` are the reserved VictoriaLogs fields; everything else
/// is stored as a regular log field.
#[derive(Debug, Serialize)]
pub struct WireRecord<'a> {
    #[serde(rename = "_msg")]
    pub msg: &'a str,
    #[serde(rename = "_time")]
    pub time: String,
    pub level: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub service: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Fields::is_empty")]
    pub fields: &'a Fields,
}

impl<'a> From<&'a LogEntry> for WireRecord<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        WireRecord {
            msg: &entry.message,
            time: entry.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            level: entry.level.as_str(),
            service: &entry.service,
            trace_id: entry.trace_id.as_deref(),
            user_id: entry.user_id.as_deref(),
            fields: &entry.fields,
        }
    }
}

/// Serialize a single entry to one JSON line, without the trailing newline.
pub fn encode_entry(entry: &LogEntry) -> Result<String, serde_json::Error> {
    serde_json::to_string(&WireRecord::from(entry))
}

/// Serialize a batch into a newline-delimited payload.
///
/// An entry that fails to serialize is skipped; the rest of the batch is
/// still encoded. Returns the payload and the number of encoded lines.
pub fn encode_batch(batch: &[LogEntry]) -> (String, usize) {
    let mut payload = String::new();
    let mut lines = 0;
    for entry in batch {
        match encode_entry(entry) {
            Ok(line) => {
                payload.push_str(&line);
                payload.push('\n');
                lines += 1;
            }
            Err(e) => warn!("skipping log entry that failed to serialize: {e}"),
        }
    }
    (payload, lines)
}
