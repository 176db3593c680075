//! Trace sink contract — best-effort workflow observability.
//!
//! The workflow emits one event per node execution and one per turn. Sinks
//! are infallible by signature; a sink that cannot record simply drops the
//! event. Nothing in a sink may fail a turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result side of a trace event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// The traced operation produced outputs.
    Output { value: serde_json::Value },
    /// The traced operation failed.
    Error { message: String },
}

/// A single observability event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Event name (e.g., "node.generate", "turn").
    pub name: String,

    /// Thread this event belongs to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Structured inputs snapshot.
    pub inputs: serde_json::Value,

    /// Outputs or error.
    pub outcome: TraceOutcome,

    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    /// Build a success event.
    pub fn output(
        name: impl Into<String>,
        thread_id: Option<&str>,
        inputs: serde_json::Value,
        value: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            thread_id: thread_id.map(String::from),
            inputs,
            outcome: TraceOutcome::Output { value },
            timestamp: Utc::now(),
        }
    }

    /// Build a failure event.
    pub fn error(
        name: impl Into<String>,
        thread_id: Option<&str>,
        inputs: serde_json::Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            thread_id: thread_id.map(String::from),
            inputs,
            outcome: TraceOutcome::Error {
                message: message.into(),
            },
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, TraceOutcome::Error { .. })
    }
}

/// Trait for trace sinks (where events are written).
pub trait TraceSink: Send + Sync {
    fn record_event(&self, event: TraceEvent);
}

/// A sink that discards every event.
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn record_event(&self, _event: TraceEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_event_shape() {
        let event = TraceEvent::output(
            "node.generate",
            Some("revenue_streams:tok"),
            serde_json::json!({"messages": 3}),
            serde_json::json!({"reply_len": 42}),
        );
        assert!(!event.is_error());
        assert_eq!(event.thread_id.as_deref(), Some("revenue_streams:tok"));
    }

    #[test]
    fn error_event_serializes_with_tag() {
        let event = TraceEvent::error("turn", None, serde_json::Value::Null, "boom");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"error""#));
        assert!(json.contains("boom"));
    }

    #[test]
    fn noop_sink_accepts_events() {
        NoopTraceSink.record_event(TraceEvent::output(
            "x",
            None,
            serde_json::Value::Null,
            serde_json::Value::Null,
        ));
    }
}
