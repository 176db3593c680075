//! Trace sink implementations.
//!
//! Sinks receive workflow [`TraceEvent`]s best-effort: a sink that cannot
//! record simply drops the event, and nothing here can fail a turn.

use std::collections::VecDeque;
use std::sync::Mutex;

use bizcanvas_core::trace::{TraceEvent, TraceOutcome, TraceSink};

/// Forwards events to the `tracing` subscriber.
pub struct TracingTraceSink;

impl TraceSink for TracingTraceSink {
    fn record_event(&self, event: TraceEvent) {
        match &event.outcome {
            TraceOutcome::Output { value } => {
                tracing::info!(
                    name = %event.name,
                    thread_id = event.thread_id.as_deref().unwrap_or("-"),
                    inputs = %event.inputs,
                    outputs = %value,
                    "TRACE"
                );
            }
            TraceOutcome::Error { message } => {
                tracing::warn!(
                    name = %event.name,
                    thread_id = event.thread_id.as_deref().unwrap_or("-"),
                    inputs = %event.inputs,
                    error = %message,
                    "TRACE"
                );
            }
        }
    }
}

/// Default retained events in the in-memory sink.
const DEFAULT_CAPACITY: usize = 500;

/// Buffers recent events in memory, oldest evicted first.
/// Useful for tests and diagnostics endpoints.
pub struct InMemoryTraceSink {
    events: Mutex<VecDeque<TraceEvent>>,
    capacity: usize,
}

impl InMemoryTraceSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of retained events, oldest first.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().unwrap().iter().cloned().collect()
    }

    /// Retained events with the given name.
    pub fn events_named(&self, name: &str) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl Default for InMemoryTraceSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for InMemoryTraceSink {
    fn record_event(&self, event: TraceEvent) {
        let mut events = self.events.lock().unwrap();
        events.push_back(event);
        while events.len() > self.capacity {
            events.pop_front();
        }
    }
}
