//! Telemetry Event Types
//!
//! Immutable, timestamped telemetry events. One event per recorded
//! occurrence; events are append-only and never modified after creation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Optional structured properties attached to an event
pub type Props = Map<String, Value>;

/// One recorded occurrence
///
/// Serialized as a single JSON line in the local log and, after
/// sanitization, as an element of an upload batch. Field names on the wire
/// are camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// When the event was created (ISO-8601 / RFC-3339)
    pub ts: String,
    /// Short dotted event name (e.g. "story.new"), opaque to this subsystem
    pub event: String,
    /// Optional properties; omitted entirely when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Props>,
    /// Stable identifier for the installation
    pub install_id: String,
    /// Identifier generated once per process run
    pub session_id: String,
    /// Positive integer, strictly increasing within a session, from 1
    pub seq: u64,
}

impl TelemetryEvent {
    /// Serialize to a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
