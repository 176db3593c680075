//! Workflow graph nodes.
//!
//! Each node reads the running state and returns tagged partial updates;
//! the graph driver applies them and checkpoints. Only the generation node
//! may fail the turn — ingestion degrades instead of aborting.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use bizcanvas_core::message::Message;
use bizcanvas_core::provider::{Provider, ProviderRequest};
use bizcanvas_security::audit::{payload_digest, AuditLog};
use bizcanvas_security::filename::sanitize_filename;
use bizcanvas_security::gate::SecurityGate;

use crate::prompts;
use crate::service::TurnError;
use crate::state::ConversationState;
use crate::update::StateUpdate;

/// A node in the conversation workflow graph.
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &ConversationState) -> Result<Vec<StateUpdate>, TurnError>;
}

// ── Ingest ────────────────────────────────────────────────────────────────

/// Validates the turn's optional attachment behind the security gate.
///
/// Terminal in one hop: every path emits `AttachmentValidated`, so the
/// generation node can rely on validation having completed. Non-VALID gate
/// outcomes and payload errors degrade the file path (error string attached,
/// attachment dropped) rather than aborting the turn.
pub struct IngestNode {
    gate: Arc<SecurityGate>,
    audit: Arc<AuditLog>,
    max_attachment_bytes: usize,
}

impl IngestNode {
    pub fn new(gate: Arc<SecurityGate>, audit: Arc<AuditLog>, max_attachment_bytes: usize) -> Self {
        Self {
            gate,
            audit,
            max_attachment_bytes,
        }
    }
}

#[async_trait]
impl WorkflowNode for IngestNode {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn run(&self, state: &ConversationState) -> Result<Vec<StateUpdate>, TurnError> {
        let Some(attachment) = &state.attachment else {
            // No attachment: nothing to validate, no gate call.
            return Ok(vec![StateUpdate::AttachmentValidated { error: None }]);
        };

        let sanitized_name = attachment.name.as_deref().map(sanitize_filename);
        if let (Some(original), Some(sanitized)) = (attachment.name.as_deref(), &sanitized_name)
            && original != sanitized
        {
            warn!(original, sanitized, "Attachment name sanitized");
        }

        let (outcome, context) = self
            .gate
            .validate(state.security_token.as_deref(), "file_processing")
            .await;

        let Some(context) = context else {
            // No resolvable context: degrade without an audit record.
            let error = outcome.describe("file_processing");
            warn!(
                thread_id = %state.thread_id,
                outcome = %outcome,
                "Attachment rejected without audit context"
            );
            return Ok(vec![StateUpdate::AttachmentValidated { error: Some(error) }]);
        };

        let size = attachment.size();
        let kind = attachment.kind.label();
        let digest = payload_digest(&attachment.data);

        if size > self.max_attachment_bytes {
            let error = format!(
                "attachment rejected: {size} bytes exceeds the {} byte cap",
                self.max_attachment_bytes
            );
            self.audit.record(
                &context,
                kind,
                sanitized_name.as_deref(),
                size,
                Some(digest),
                false,
                Some(error.clone()),
            );
            warn!(thread_id = %state.thread_id, size, "Oversized attachment rejected");
            return Ok(vec![StateUpdate::AttachmentValidated { error: Some(error) }]);
        }

        let operation_id = self.audit.record(
            &context,
            kind,
            sanitized_name.as_deref(),
            size,
            Some(digest),
            true,
            None,
        );
        info!(
            thread_id = %state.thread_id,
            operation_id,
            kind,
            size,
            business = %context.business_name,
            "Attachment validated"
        );

        let mut updates = Vec::new();
        if let Some(name) = sanitized_name {
            updates.push(StateUpdate::SanitizeAttachmentName(name));
        }
        updates.push(StateUpdate::AttachmentValidated { error: None });
        Ok(updates)
    }
}

// ── Generate ──────────────────────────────────────────────────────────────

/// Produces exactly one assistant message from the expert persona.
pub struct GenerateNode {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl GenerateNode {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    /// Assemble the provider request from the running state.
    ///
    /// A validated attachment rides along for the provider to encode;
    /// encoding is not this node's concern.
    pub fn build_request(&self, state: &ConversationState) -> ProviderRequest {
        let client_section = prompts::client_profile_section(state.user_context.as_ref());
        let system = prompts::expert_character_card(
            &state.expert,
            &state.expert_context,
            &client_section,
            &state.summary,
        );

        let mut request = ProviderRequest::new(&self.model, system, state.messages.clone());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        if let Some(attachment) = state.usable_attachment() {
            request.attachment = Some(attachment.clone());
        }
        request
    }

    /// Open a streaming generation for the current state.
    pub async fn open_stream(
        &self,
        state: &ConversationState,
    ) -> Result<
        tokio::sync::mpsc::Receiver<
            Result<bizcanvas_core::provider::StreamChunk, bizcanvas_core::error::ProviderError>,
        >,
        TurnError,
    > {
        let request = self.build_request(state);
        Ok(self.provider.stream(request).await?)
    }
}

#[async_trait]
impl WorkflowNode for GenerateNode {
    fn name(&self) -> &'static str {
        "generate"
    }

    async fn run(&self, state: &ConversationState) -> Result<Vec<StateUpdate>, TurnError> {
        debug_assert!(
            state.attachment.is_none() || state.attachment_validated,
            "generation must not run before attachment validation completes"
        );

        let request = self.build_request(state);
        debug!(
            thread_id = %state.thread_id,
            messages = request.messages.len(),
            multimodal = request.attachment.is_some(),
            "Generating expert reply"
        );

        let response = self.provider.complete(request).await?;
        Ok(vec![StateUpdate::AppendMessage(response.message)])
    }
}

// ── Summarize ─────────────────────────────────────────────────────────────

/// Compacts long histories into a rolling summary.
///
/// A fresh summary is derived from the full history; once a summary exists,
/// later runs *extend* it from the prior summary plus new messages instead
/// of re-deriving from scratch. After summarizing, the history prefix is
/// destructively pruned down to the retention window.
pub struct SummarizeNode {
    provider: Arc<dyn Provider>,
    model: String,
    keep_after_summary: usize,
}

impl SummarizeNode {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        keep_after_summary: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            keep_after_summary,
        }
    }
}

#[async_trait]
impl WorkflowNode for SummarizeNode {
    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn run(&self, state: &ConversationState) -> Result<Vec<StateUpdate>, TurnError> {
        let instruction = if state.summary.is_empty() {
            prompts::summary_prompt(&state.expert.name)
        } else {
            prompts::extend_summary_prompt(&state.expert.name, &state.summary)
        };

        let mut messages = state.messages.clone();
        messages.push(Message::user(instruction));

        let mut request = ProviderRequest::new(&self.model, String::new(), messages);
        request.temperature = 0.3;

        debug!(
            thread_id = %state.thread_id,
            extending = !state.summary.is_empty(),
            history = state.messages.len(),
            "Summarizing conversation"
        );

        let response = self.provider.complete(request).await?;

        Ok(vec![
            StateUpdate::ReplaceSummary(response.message.content),
            StateUpdate::PruneMessages {
                keep_last: self.keep_after_summary,
            },
        ])
    }
}
