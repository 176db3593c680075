//! The turn service — the surface the HTTP layer calls.
//!
//! Owns the graph (constructed once, reused for every turn), derives thread
//! ids, serializes turns per thread via checkpoint leases, and restores
//! checkpointed history before execution.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use bizcanvas_core::attachment::Attachment;
use bizcanvas_core::checkpoint::CheckpointStore;
use bizcanvas_core::error::{CheckpointError, ProviderError};
use bizcanvas_core::expert::ExpertProfile;
use bizcanvas_core::message::{Message, ThreadId};
use bizcanvas_core::principal::{Principal, PrincipalLookup};
use bizcanvas_core::provider::Provider;
use bizcanvas_core::trace::{TraceEvent, TraceSink};
use bizcanvas_security::audit::AuditLog;
use bizcanvas_security::gate::SecurityGate;

use crate::graph::WorkflowGraph;
use crate::nodes::{GenerateNode, IngestNode, SummarizeNode};
use crate::state::ConversationState;

/// Failures that abort a turn.
///
/// Credential, infrastructure, and payload problems never appear here —
/// they degrade the file path and the turn completes. Only generation and
/// checkpoint failures abort.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Generation failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("Checkpoint failure: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Workflow terminated without an assistant reply")]
    NoReply,
}

/// Tunables for the workflow, mapped from application configuration.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Model used by the generation node.
    pub model: String,

    /// Model used by the summarization node.
    pub summary_model: String,

    /// Generation temperature.
    pub temperature: f32,

    /// Max tokens per generated reply.
    pub max_tokens: Option<u32>,

    /// Message count above which compaction runs.
    pub summary_trigger: usize,

    /// Messages retained after a compaction prune.
    pub keep_after_summary: usize,

    /// Decoded attachment size cap in bytes.
    pub max_attachment_bytes: usize,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".into(),
            summary_model: "llama-3.1-8b-instant".into(),
            temperature: 0.7,
            max_tokens: None,
            summary_trigger: 14,
            keep_after_summary: 5,
            max_attachment_bytes: 5 * 1024 * 1024,
        }
    }
}

/// One inbound turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// The expert persona for this conversation.
    pub expert: ExpertProfile,

    /// Free-text expertise context. Defaults to the profile's own context.
    pub expert_context: Option<String>,

    /// The client's message text.
    pub message: String,

    /// Caller-supplied access token.
    pub token: Option<String>,

    /// Pre-resolved client profile for prompt context.
    pub user_context: Option<Principal>,

    /// Optional attachment for this turn.
    pub attachment: Option<Attachment>,

    /// Force a fresh, disconnected thread.
    pub new_thread: bool,
}

impl TurnRequest {
    pub fn new(expert: ExpertProfile, message: impl Into<String>) -> Self {
        Self {
            expert,
            expert_context: None,
            message: message.into(),
            token: None,
            user_context: None,
            attachment: None,
            new_thread: false,
        }
    }
}

/// The conversation workflow service.
pub struct ConversationWorkflow {
    graph: WorkflowGraph,
    checkpoint: Arc<dyn CheckpointStore>,
    trace: Arc<dyn TraceSink>,
}

impl ConversationWorkflow {
    /// Wire the graph from its collaborators. Called once at startup; the
    /// constructed graph is reused for every turn.
    pub fn new(
        provider: Arc<dyn Provider>,
        lookup: Arc<dyn PrincipalLookup>,
        checkpoint: Arc<dyn CheckpointStore>,
        audit: Arc<AuditLog>,
        trace: Arc<dyn TraceSink>,
        options: WorkflowOptions,
    ) -> Self {
        let gate = Arc::new(SecurityGate::new(lookup));
        let graph = WorkflowGraph::new(
            IngestNode::new(gate, audit, options.max_attachment_bytes),
            GenerateNode::new(
                provider.clone(),
                &options.model,
                options.temperature,
                options.max_tokens,
            ),
            SummarizeNode::new(provider, &options.summary_model, options.keep_after_summary),
            options.summary_trigger,
            checkpoint.clone(),
            trace.clone(),
        );

        Self {
            graph,
            checkpoint,
            trace,
        }
    }

    /// Build the turn's initial state from the request plus checkpointed
    /// history, appending the inbound user message.
    async fn restore_state(
        &self,
        request: TurnRequest,
        thread_id: ThreadId,
    ) -> Result<ConversationState, TurnError> {
        let prior = self
            .checkpoint
            .load(&thread_id)
            .await?
            .unwrap_or_default();

        let expert_context = request
            .expert_context
            .unwrap_or_else(|| request.expert.context());

        let mut state = ConversationState {
            thread_id,
            expert: request.expert,
            expert_context,
            user_context: request.user_context,
            security_token: request.token,
            messages: prior.messages,
            summary: prior.summary,
            attachment: request.attachment,
            attachment_validated: false,
            ingest_error: None,
        };
        state.messages.push(Message::user(request.message));
        Ok(state)
    }

    /// Run one turn to completion and return the expert's reply plus the
    /// final state.
    pub async fn run_turn(
        &self,
        request: TurnRequest,
    ) -> Result<(String, ConversationState), TurnError> {
        let thread_id = ThreadId::derive(
            &request.expert.id,
            request.token.as_deref(),
            request.new_thread,
        );
        info!(thread_id = %thread_id, expert = %request.expert.id, "Running conversation turn");

        let _lease = self.checkpoint.lease(&thread_id).await;
        let mut state = self.restore_state(request, thread_id).await?;

        let turn_inputs = serde_json::json!({
            "messages": state.messages.len(),
            "has_attachment": state.attachment.is_some(),
        });

        match self.graph.execute(&mut state).await {
            Ok(()) => {
                let reply = state
                    .last_assistant_reply()
                    .map(String::from)
                    .ok_or(TurnError::NoReply)?;

                self.trace.record_event(TraceEvent::output(
                    "turn",
                    Some(state.thread_id.as_str()),
                    turn_inputs,
                    serde_json::json!({
                        "reply_chars": reply.len(),
                        "messages": state.messages.len(),
                        "degraded": state.ingest_error.is_some(),
                    }),
                ));
                Ok((reply, state))
            }
            Err(e) => {
                self.trace.record_event(TraceEvent::error(
                    "turn",
                    Some(state.thread_id.as_str()),
                    turn_inputs,
                    e.to_string(),
                ));
                Err(e)
            }
        }
    }

    /// Run one turn in streaming mode, yielding text fragments of the
    /// expert's reply as they are produced.
    pub async fn run_turn_stream(
        &self,
        request: TurnRequest,
    ) -> Result<mpsc::Receiver<Result<String, TurnError>>, TurnError> {
        let thread_id = ThreadId::derive(
            &request.expert.id,
            request.token.as_deref(),
            request.new_thread,
        );
        info!(thread_id = %thread_id, expert = %request.expert.id, "Running streaming turn");

        let lease = self.checkpoint.lease(&thread_id).await;
        let state = self.restore_state(request, thread_id).await?;

        self.graph.execute_streaming(state, lease).await
    }
}
