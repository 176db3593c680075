//! The workflow graph: fixed nodes, routing policy, and execution drivers.
//!
//! The graph is constructed once and reused across turns. The synchronous
//! driver runs ingest → generate → (conditional) summarize, applying each
//! node's partial updates and checkpointing at every node boundary. The
//! streaming driver emits the generation node's text fragments as they are
//! produced and performs no summarization.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use bizcanvas_core::checkpoint::{Checkpoint, CheckpointStore, ThreadLease};
use bizcanvas_core::message::Message;
use bizcanvas_core::trace::{TraceEvent, TraceSink};

use crate::edges::{should_summarize, Route};
use crate::nodes::{GenerateNode, IngestNode, SummarizeNode, WorkflowNode};
use crate::service::TurnError;
use crate::state::ConversationState;
use crate::update::{apply, StateUpdate};

/// The fixed nodes of the conversation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Ingest,
    Generate,
    Summarize,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ingest => "ingest",
            Self::Generate => "generate",
            Self::Summarize => "summarize",
        };
        write!(f, "{s}")
    }
}

/// The conversation workflow graph and its execution drivers.
pub struct WorkflowGraph {
    ingest: IngestNode,
    generate: GenerateNode,
    summarize: SummarizeNode,
    summary_trigger: usize,
    checkpoint: Arc<dyn CheckpointStore>,
    trace: Arc<dyn TraceSink>,
}

impl WorkflowGraph {
    pub fn new(
        ingest: IngestNode,
        generate: GenerateNode,
        summarize: SummarizeNode,
        summary_trigger: usize,
        checkpoint: Arc<dyn CheckpointStore>,
        trace: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            ingest,
            generate,
            summarize,
            summary_trigger,
            checkpoint,
            trace,
        }
    }

    /// The fixed entry node.
    fn entry() -> NodeKind {
        NodeKind::Ingest
    }

    /// Routing policy: which node follows `current` given the state.
    fn next(&self, current: NodeKind, state: &ConversationState) -> Option<NodeKind> {
        match current {
            NodeKind::Ingest => Some(NodeKind::Generate),
            NodeKind::Generate => match should_summarize(state, self.summary_trigger) {
                Route::Summarize => Some(NodeKind::Summarize),
                Route::End => None,
            },
            NodeKind::Summarize => None,
        }
    }

    async fn run_node(
        &self,
        kind: NodeKind,
        state: &ConversationState,
    ) -> Result<Vec<StateUpdate>, TurnError> {
        match kind {
            NodeKind::Ingest => self.ingest.run(state).await,
            NodeKind::Generate => self.generate.run(state).await,
            NodeKind::Summarize => self.summarize.run(state).await,
        }
    }

    fn node_inputs(kind: NodeKind, state: &ConversationState) -> serde_json::Value {
        serde_json::json!({
            "node": kind.to_string(),
            "messages": state.messages.len(),
            "has_attachment": state.attachment.is_some(),
            "has_summary": !state.summary.is_empty(),
        })
    }

    /// Best-effort trace emission; sink behavior never fails the turn.
    fn emit(&self, event: TraceEvent) {
        self.trace.record_event(event);
    }

    async fn save_checkpoint(&self, state: &ConversationState) -> Result<(), TurnError> {
        self.checkpoint
            .save(
                &state.thread_id,
                Checkpoint::new(state.messages.clone(), state.summary.clone()),
            )
            .await?;
        Ok(())
    }

    /// Synchronous driver: run to the terminal node.
    pub async fn execute(&self, state: &mut ConversationState) -> Result<(), TurnError> {
        let mut current = Some(Self::entry());

        while let Some(kind) = current {
            let inputs = Self::node_inputs(kind, state);
            debug!(thread_id = %state.thread_id, node = %kind, "Running workflow node");

            match self.run_node(kind, state).await {
                Ok(updates) => {
                    self.emit(TraceEvent::output(
                        format!("node.{kind}"),
                        Some(state.thread_id.as_str()),
                        inputs,
                        serde_json::json!({ "updates": updates.len() }),
                    ));
                    apply(state, updates);
                    self.save_checkpoint(state).await?;
                }
                Err(e) => {
                    self.emit(TraceEvent::error(
                        format!("node.{kind}"),
                        Some(state.thread_id.as_str()),
                        inputs,
                        e.to_string(),
                    ));
                    return Err(e);
                }
            }

            current = self.next(kind, state);
        }

        Ok(())
    }

    /// Streaming driver: emit generation text fragments as they arrive.
    ///
    /// Runs ingestion up front, then forwards provider chunks. The full
    /// assistant message is appended and checkpointed when the stream
    /// completes; no summarization-node invocation happens in this mode.
    /// The lease is held by the forwarding task until the final checkpoint.
    pub async fn execute_streaming(
        &self,
        mut state: ConversationState,
        lease: ThreadLease,
    ) -> Result<mpsc::Receiver<Result<String, TurnError>>, TurnError> {
        let inputs = Self::node_inputs(NodeKind::Ingest, &state);
        match self.ingest.run(&state).await {
            Ok(updates) => {
                self.emit(TraceEvent::output(
                    "node.ingest",
                    Some(state.thread_id.as_str()),
                    inputs,
                    serde_json::json!({ "updates": updates.len() }),
                ));
                apply(&mut state, updates);
                self.save_checkpoint(&state).await?;
            }
            Err(e) => {
                self.emit(TraceEvent::error(
                    "node.ingest",
                    Some(state.thread_id.as_str()),
                    inputs,
                    e.to_string(),
                ));
                return Err(e);
            }
        }

        let mut chunks = self.generate.open_stream(&state).await?;

        let (tx, rx) = mpsc::channel::<Result<String, TurnError>>(64);
        let checkpoint = self.checkpoint.clone();
        let trace = self.trace.clone();

        tokio::spawn(async move {
            // Moved in so the per-thread serialization covers the whole stream.
            let _lease = lease;
            let mut reply = String::new();

            while let Some(chunk) = chunks.recv().await {
                match chunk {
                    Ok(chunk) => {
                        if let Some(content) = chunk.content {
                            reply.push_str(&content);
                            if tx.send(Ok(content)).await.is_err() {
                                // Caller abandoned the stream; still finish
                                // the checkpoint below with what we have.
                                break;
                            }
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(thread_id = %state.thread_id, error = %e, "Generation stream failed");
                        trace.record_event(TraceEvent::error(
                            "node.generate",
                            Some(state.thread_id.as_str()),
                            serde_json::json!({ "streaming": true }),
                            e.to_string(),
                        ));
                        let _ = tx.send(Err(TurnError::Generation(e))).await;
                        return;
                    }
                }
            }

            if reply.is_empty() {
                return;
            }

            trace.record_event(TraceEvent::output(
                "node.generate",
                Some(state.thread_id.as_str()),
                serde_json::json!({ "streaming": true }),
                serde_json::json!({ "reply_chars": reply.len() }),
            ));

            state.messages.push(Message::assistant(reply));
            if let Err(e) = checkpoint
                .save(
                    &state.thread_id,
                    Checkpoint::new(state.messages.clone(), state.summary.clone()),
                )
                .await
            {
                warn!(thread_id = %state.thread_id, error = %e, "Streaming checkpoint failed");
            }
        });

        Ok(rx)
    }
}
