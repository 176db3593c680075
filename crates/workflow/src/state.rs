//! Conversation state — the unit of truth for one turn and its history.

use bizcanvas_core::attachment::Attachment;
use bizcanvas_core::expert::ExpertProfile;
use bizcanvas_core::message::{Message, Role, ThreadId};
use bizcanvas_core::principal::Principal;

/// The state flowing through the workflow graph for a single turn.
///
/// Constructed fresh per inbound turn from caller-supplied fields plus the
/// previously checkpointed history for the thread. Mutated only via
/// node-returned [`crate::StateUpdate`]s applied by the reducer.
#[derive(Debug, Clone)]
pub struct ConversationState {
    /// Stable key for the persisted conversation lineage.
    pub thread_id: ThreadId,

    /// The expert persona, immutable per conversation.
    pub expert: ExpertProfile,

    /// Free-text expertise context supplied by the caller.
    pub expert_context: String,

    /// Structured client profile, merged into generation prompts verbatim.
    pub user_context: Option<Principal>,

    /// Caller-supplied credential, consumed only by the security gate.
    pub security_token: Option<String>,

    /// Ordered role-tagged turns. Append-only except for compaction prunes.
    pub messages: Vec<Message>,

    /// Rolling compression of pruned history; empty until first compaction.
    pub summary: String,

    /// Turn-scoped attachment, dropped when ingestion fails.
    pub attachment: Option<Attachment>,

    /// Whether the ingest node has completed (success or failure).
    pub attachment_validated: bool,

    /// Degraded-path error description from ingestion, if any.
    pub ingest_error: Option<String>,
}

impl ConversationState {
    /// The last assistant reply, if the generation node has run.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Whether a validated attachment is available for generation.
    pub fn usable_attachment(&self) -> Option<&Attachment> {
        if self.attachment_validated && self.ingest_error.is_none() {
            self.attachment.as_ref()
        } else {
            None
        }
    }

    /// Short human-readable digest for logging.
    ///
    /// Prefers the rolling summary over raw messages once one exists.
    pub fn digest(&self) -> String {
        let conversation = if !self.summary.is_empty() {
            self.summary.clone()
        } else if !self.messages.is_empty() {
            self.messages
                .iter()
                .map(|m| {
                    let role = match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    };
                    format!("{role}: {}", m.content)
                })
                .collect::<Vec<_>>()
                .join(" | ")
        } else {
            String::new()
        };

        let client = self
            .user_context
            .as_ref()
            .map(|u| u.business_name.as_str())
            .unwrap_or("Unknown");

        format!(
            "ConversationState(expert={}, domain={}, client={client}, conversation={conversation})",
            self.expert.name, self.expert.domain
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizcanvas_core::expert::ExpertCatalog;

    fn state() -> ConversationState {
        let expert = ExpertCatalog::builtin().get("revenue_streams").unwrap().clone();
        ConversationState {
            thread_id: ThreadId::derive(&expert.id, Some("tok"), false),
            expert_context: expert.context(),
            expert,
            user_context: None,
            security_token: Some("tok".into()),
            messages: vec![],
            summary: String::new(),
            attachment: None,
            attachment_validated: false,
            ingest_error: None,
        }
    }

    #[test]
    fn digest_uses_messages_when_no_summary() {
        let mut s = state();
        s.messages.push(Message::user("How do I price my service?"));
        let digest = s.digest();
        assert!(digest.contains("user: How do I price my service?"));
        assert!(digest.contains("expert=Ryan Revenue"));
        assert!(digest.contains("client=Unknown"));
    }

    #[test]
    fn digest_prefers_summary() {
        let mut s = state();
        s.messages.push(Message::user("long history"));
        s.summary = "Pricing discussion so far".into();
        let digest = s.digest();
        assert!(digest.contains("Pricing discussion so far"));
        assert!(!digest.contains("long history"));
    }

    #[test]
    fn usable_attachment_requires_clean_validation() {
        use bizcanvas_core::attachment::{Attachment, AttachmentKind};

        let mut s = state();
        s.attachment = Some(Attachment::new(AttachmentKind::Png, vec![1]));
        assert!(s.usable_attachment().is_none(), "not yet validated");

        s.attachment_validated = true;
        assert!(s.usable_attachment().is_some());

        s.ingest_error = Some("rejected".into());
        assert!(s.usable_attachment().is_none());
    }

    #[test]
    fn last_assistant_reply_skips_user_turns() {
        let mut s = state();
        s.messages.push(Message::user("q1"));
        s.messages.push(Message::assistant("a1"));
        s.messages.push(Message::user("q2"));
        assert_eq!(s.last_assistant_reply(), Some("a1"));
    }
}
