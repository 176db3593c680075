//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a prepared prompt context to an LLM and get
//! the expert's reply back, either as a complete message or as a stream of
//! text fragments. Building the model-specific payload (including multimodal
//! attachment parts) is the provider's concern, not the workflow's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::error::ProviderError;
use crate::message::Message;

/// A fully prepared generation request.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// The model to use (e.g., "llama-3.3-70b-versatile").
    pub model: String,

    /// System prompt (expert character card, client profile, summary).
    pub system: String,

    /// The conversation messages, oldest first.
    pub messages: Vec<Message>,

    /// Optional validated attachment for the current turn. When present,
    /// the provider combines the last user message's text and the
    /// attachment as distinct content parts — text first, attachment
    /// second.
    pub attachment: Option<Attachment>,

    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,

    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            messages,
            attachment: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// The generated assistant message.
    pub message: Message,

    /// Token usage statistics.
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested).
    pub model: String,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta.
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk.
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Provider trait.
///
/// The workflow nodes call `complete()` or `stream()` without knowing which
/// backend is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "groq").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.message.content),
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}
