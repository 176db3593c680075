//! In-memory checkpoint store — per-thread conversation snapshots.
//!
//! State lives for the process lifetime only; there is no deletion path and
//! no durability guarantee. Each thread id owns a lease mutex: a turn holds
//! the lease from load to final save, so a read-then-write against one
//! thread can never be corrupted by a concurrent turn against the same
//! thread. Distinct threads never contend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use bizcanvas_core::checkpoint::{Checkpoint, CheckpointStore, ThreadLease};
use bizcanvas_core::error::CheckpointError;
use bizcanvas_core::message::ThreadId;

/// An in-memory checkpoint store.
pub struct InMemoryCheckpointStore {
    snapshots: RwLock<HashMap<String, Checkpoint>>,
    leases: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct threads with a checkpoint.
    pub async fn thread_count(&self) -> usize {
        self.snapshots.read().await.len()
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(
        &self,
        thread_id: &ThreadId,
    ) -> std::result::Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.snapshots.read().await.get(thread_id.as_str()).cloned())
    }

    async fn save(
        &self,
        thread_id: &ThreadId,
        checkpoint: Checkpoint,
    ) -> std::result::Result<(), CheckpointError> {
        debug!(
            thread_id = %thread_id,
            messages = checkpoint.messages.len(),
            has_summary = !checkpoint.summary.is_empty(),
            "Checkpoint saved"
        );
        self.snapshots
            .write()
            .await
            .insert(thread_id.as_str().to_string(), checkpoint);
        Ok(())
    }

    async fn lease(&self, thread_id: &ThreadId) -> ThreadLease {
        let mutex = {
            let mut leases = self.leases.lock().await;
            leases
                .entry(thread_id.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }
}
