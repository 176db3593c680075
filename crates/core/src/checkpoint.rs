//! Checkpoint store contract — per-thread conversation persistence.
//!
//! A checkpoint is the persisted snapshot of a thread's message history and
//! rolling summary. Stores are process-lifetime only; the core makes no
//! durability demands. To prevent lost updates when a client double-submits,
//! a store hands out per-thread leases that serialize whole turns against
//! the same thread id — turns on distinct threads never contend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;
use crate::message::{Message, ThreadId};

/// The persisted snapshot of one conversation thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Ordered message history (post-compaction suffix).
    pub messages: Vec<Message>,

    /// Rolling summary of pruned history; empty until first compaction.
    #[serde(default)]
    pub summary: String,

    /// When this checkpoint was last written.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(messages: Vec<Message>, summary: String) -> Self {
        Self {
            messages,
            summary,
            updated_at: Utc::now(),
        }
    }
}

/// An exclusive lease on a thread id, held for the duration of a turn.
pub type ThreadLease = tokio::sync::OwnedMutexGuard<()>;

/// The checkpoint store collaborator contract.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Load the checkpoint for a thread, if one exists.
    async fn load(
        &self,
        thread_id: &ThreadId,
    ) -> std::result::Result<Option<Checkpoint>, CheckpointError>;

    /// Persist the checkpoint for a thread, replacing any prior snapshot.
    async fn save(
        &self,
        thread_id: &ThreadId,
        checkpoint: Checkpoint,
    ) -> std::result::Result<(), CheckpointError>;

    /// Acquire the per-thread lease. Blocks while another turn holds it.
    async fn lease(&self, thread_id: &ThreadId) -> ThreadLease;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_default_is_empty() {
        let cp = Checkpoint::default();
        assert!(cp.messages.is_empty());
        assert!(cp.summary.is_empty());
    }

    #[test]
    fn checkpoint_serialization_roundtrip() {
        let cp = Checkpoint::new(vec![Message::user("hello")], "a summary".into());
        let json = serde_json::to_string(&cp).unwrap();
        let back: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.messages.len(), 1);
        assert_eq!(back.summary, "a summary");
    }
}
