//! Conditional routing between workflow nodes.

use crate::state::ConversationState;

/// Where the graph goes after the generation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Run the summarization node before terminating.
    Summarize,
    /// Terminate the turn.
    End,
}

/// Summarization decision: compact once the history outgrows the trigger.
pub fn should_summarize(state: &ConversationState, summary_trigger: usize) -> Route {
    if state.messages.len() > summary_trigger {
        Route::Summarize
    } else {
        Route::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizcanvas_core::expert::ExpertCatalog;
    use bizcanvas_core::message::{Message, ThreadId};

    fn state_with_messages(count: usize) -> ConversationState {
        let expert = ExpertCatalog::builtin().get("channels").unwrap().clone();
        ConversationState {
            thread_id: ThreadId::derive(&expert.id, None, false),
            expert_context: expert.context(),
            expert,
            user_context: None,
            security_token: None,
            messages: (0..count).map(|i| Message::user(format!("m{i}"))).collect(),
            summary: String::new(),
            attachment: None,
            attachment_validated: true,
            ingest_error: None,
        }
    }

    #[test]
    fn short_history_terminates() {
        assert_eq!(should_summarize(&state_with_messages(14), 14), Route::End);
    }

    #[test]
    fn history_above_trigger_summarizes() {
        assert_eq!(
            should_summarize(&state_with_messages(15), 14),
            Route::Summarize
        );
    }

    #[test]
    fn trigger_is_strictly_greater_than() {
        // Exactly at the trigger: no compaction
        assert_eq!(should_summarize(&state_with_messages(5), 5), Route::End);
        assert_eq!(
            should_summarize(&state_with_messages(6), 5),
            Route::Summarize
        );
    }
}
