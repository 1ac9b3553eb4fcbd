//! Structured event logging and the live telemetry channel.
//!
//! Two channels, per §10.2:
//! - A durable JSONL audit trail, appended through the storage backend,
//!   mirroring the teacher's `broker.events.jsonl` / `BrokerEvent` shape
//!   (`core/broker.rs::log_event`, `core/trace.rs::append_trace`).
//! - A live, best-effort `mpsc` fan-out a host can drain without ever
//!   blocking the engine: a full or disconnected channel is swallowed, not
//!   propagated.
//!
//! Every emitted event also goes through `tracing`, at `debug` for a normal
//! append and `warn` when the live channel is dropping events under
//! backpressure. As a library, this crate never installs a subscriber itself
//! (the teacher's own subscriber setup lives in its binary's `main`, not its
//! `core/` library code) — a host wires one up with `tracing_subscriber` the
//! same way; without one, these events are simply discarded.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::time::{new_id, now_rfc3339};

pub const AUDIT_LOG_PATH: &str = "telemetry.events.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    Status,
    Log,
    Progress,
    FrameOpen,
    FrameClose,
    PhaseStart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub kind: TelemetryKind,
    pub event_id: String,
    pub ts: String,
    pub session_id: Option<String>,
    pub stage: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl TelemetryEvent {
    pub fn new(kind: TelemetryKind, session_id: Option<&str>, stage: Option<&str>) -> Self {
        TelemetryEvent {
            kind,
            event_id: new_id(),
            ts: now_rfc3339(),
            session_id: session_id.map(str::to_string),
            stage: stage.map(str::to_string),
            message: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Audited, best-effort telemetry sink. Cheap to clone; the sender half of
/// the channel is reference-counted internally by `std::sync::mpsc`.
pub struct Telemetry {
    sender: SyncSender<TelemetryEvent>,
    actor: String,
}

impl Telemetry {
    /// Create a telemetry sink plus the receiver a host should drain.
    /// `capacity` bounds the in-memory backlog before sends start being
    /// dropped; drops are silent by contract (§6: "best-effort, non-blocking,
    /// at-most-once").
    pub fn new(actor: impl Into<String>, capacity: usize) -> (Self, Receiver<TelemetryEvent>) {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        (
            Telemetry {
                sender,
                actor: actor.into(),
            },
            receiver,
        )
    }

    /// Emit to the live channel and append to the durable audit log. Audit
    /// log write failures propagate (storage failures are real failures);
    /// live-channel backpressure never does.
    pub fn emit(&self, backend: &dyn StorageBackend, event: TelemetryEvent) -> Result<()> {
        append_audit_event(backend, &event, &self.actor)?;
        debug!(
            actor = %self.actor,
            kind = ?event.kind,
            session_id = ?event.session_id,
            stage = ?event.stage,
            "telemetry event appended to audit log"
        );
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(actor = %self.actor, "telemetry channel full, dropping live event");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Ok(()),
        }
    }
}

fn append_audit_event(
    backend: &dyn StorageBackend,
    event: &TelemetryEvent,
    actor: &str,
) -> Result<()> {
    #[derive(Serialize)]
    struct AuditLine<'a> {
        #[serde(flatten)]
        event: &'a TelemetryEvent,
        actor: &'a str,
    }

    let line = AuditLine { event, actor };
    let mut bytes = serde_json::to_vec(&line)?;
    bytes.push(b'\n');

    let mut existing = backend.read(AUDIT_LOG_PATH)?.unwrap_or_default();
    existing.extend_from_slice(&bytes);
    backend.write(AUDIT_LOG_PATH, &existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, StorageBackend};

    #[test]
    fn emit_appends_jsonl_and_reaches_receiver() {
        let backend = MemoryBackend::new();
        let (telemetry, rx) = Telemetry::new("test-actor", 8);
        let event = TelemetryEvent::new(TelemetryKind::Status, Some("sess-1"), Some("alpha"))
            .with_message("hello");
        telemetry.emit(&backend, event).unwrap();

        let received = rx.try_recv().unwrap();
        assert_eq!(received.message.as_deref(), Some("hello"));

        let log_bytes = String::from_utf8(backend.read(AUDIT_LOG_PATH).unwrap().unwrap()).unwrap();
        assert_eq!(log_bytes.lines().count(), 1);
        assert!(log_bytes.contains("\"actor\":\"test-actor\""));
    }

    #[test]
    fn emit_never_blocks_when_channel_is_full() {
        let backend = MemoryBackend::new();
        let (telemetry, _rx) = Telemetry::new("actor", 1);
        for _ in 0..5 {
            let event = TelemetryEvent::new(TelemetryKind::Log, None, None);
            telemetry.emit(&backend, event).unwrap();
        }
    }
}
