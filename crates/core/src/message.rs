//! Message and thread identity domain types.
//!
//! These are the core value objects that flow through the system:
//! a client sends a turn → the workflow graph processes it → the provider
//! generates the expert's reply, all keyed by a stable thread identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies the persisted lineage of one logical conversation.
///
/// Derived from the expert id plus the caller identity; stable across turns
/// unless the caller explicitly requests a fresh thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Derive a thread id from the expert/caller pair.
    ///
    /// A missing token maps to the shared `anonymous` lineage for that
    /// expert. When `new_thread` is set, a random suffix disconnects the
    /// turn from any previous history under the same pair.
    pub fn derive(expert_id: &str, token: Option<&str>, new_thread: bool) -> Self {
        let base = format!("{expert_id}:{}", token.unwrap_or("anonymous"));
        if new_thread {
            Self(format!("{base}:{}", Uuid::new_v4()))
        } else {
            Self(base)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The business owner (client)
    User,
    /// The expert persona
    Assistant,
}

/// A single message in a conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
