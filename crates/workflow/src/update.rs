//! Tagged partial updates and the single merge reducer.
//!
//! Nodes never mutate state directly; they return a sequence of
//! [`StateUpdate`]s that [`apply`] folds into the running state. Each
//! variant has one defined merge rule, so a node cannot corrupt fields it
//! does not own.

use bizcanvas_core::message::Message;
use tracing::debug;

use crate::state::ConversationState;

/// One partial state update returned by a workflow node.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    /// Append one message to the history.
    AppendMessage(Message),

    /// Replace the rolling summary.
    ReplaceSummary(String),

    /// Destructively prune the history prefix, keeping the most recent
    /// `keep_last` messages. A no-op when the history is already short.
    PruneMessages { keep_last: usize },

    /// Replace the attachment's declared name with its sanitized form.
    SanitizeAttachmentName(String),

    /// Mark attachment ingestion complete. A populated `error` records a
    /// degraded turn and drops the attachment so generation cannot use it.
    AttachmentValidated { error: Option<String> },
}

/// Fold node-returned updates into the state.
///
/// Merge rules per field: append for `messages`, replace for `summary`,
/// prefix-prune for compaction, flag-set (plus attachment drop on error)
/// for validation.
pub fn apply(state: &mut ConversationState, updates: Vec<StateUpdate>) {
    for update in updates {
        match update {
            StateUpdate::AppendMessage(message) => {
                state.messages.push(message);
            }
            StateUpdate::ReplaceSummary(summary) => {
                state.summary = summary;
            }
            StateUpdate::PruneMessages { keep_last } => {
                if state.messages.len() > keep_last {
                    let pruned = state.messages.len() - keep_last;
                    state.messages.drain(..pruned);
                    debug!(
                        thread_id = %state.thread_id,
                        pruned,
                        kept = keep_last,
                        "Pruned message history after compaction"
                    );
                }
            }
            StateUpdate::SanitizeAttachmentName(name) => {
                if let Some(attachment) = &mut state.attachment {
                    attachment.name = Some(name);
                }
            }
            StateUpdate::AttachmentValidated { error } => {
                state.attachment_validated = true;
                if error.is_some() {
                    state.attachment = None;
                }
                state.ingest_error = error;
            }
        }
    }
}
