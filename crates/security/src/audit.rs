//! Bounded audit trail for attachment processing operations.
//!
//! Each record is immutable once appended and carries a fresh operation id.
//! The log retains at most [`MAX_AUDIT_RECORDS`] records, evicting the
//! oldest first. Two read views are supported: filter-by-principal-token and
//! a global summary grouped per principal.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::gate::SecurityContext;

/// Maximum retained audit records. Oldest evicted first.
pub const MAX_AUDIT_RECORDS: usize = 1000;

/// One immutable audit record for a file operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Fresh unique identifier for this record.
    pub operation_id: String,

    /// The validated context the operation ran under.
    pub context: SecurityContext,

    /// Attachment kind label ("pdf", "image").
    pub file_kind: String,

    /// Sanitized file name, if one was declared.
    pub file_name: Option<String>,

    /// Decoded payload size in bytes.
    pub file_size: usize,

    /// SHA-256 hex digest of the payload, when computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_digest: Option<String>,

    /// When the record was appended.
    pub timestamp: DateTime<Utc>,

    /// Whether the operation succeeded.
    pub success: bool,

    /// Error description for failed operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// SHA-256 hex digest of an attachment payload.
pub fn payload_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Bounded in-memory audit log.
pub struct AuditLog {
    records: Mutex<VecDeque<AuditRecord>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a record and return its operation id.
    pub fn record(
        &self,
        context: &SecurityContext,
        file_kind: &str,
        file_name: Option<&str>,
        file_size: usize,
        payload_digest: Option<String>,
        success: bool,
        error_message: Option<String>,
    ) -> String {
        let operation_id = Uuid::new_v4().to_string();
        let record = AuditRecord {
            operation_id: operation_id.clone(),
            context: context.clone(),
            file_kind: file_kind.into(),
            file_name: file_name.map(String::from),
            file_size,
            payload_digest,
            timestamp: Utc::now(),
            success,
            error_message,
        };

        let mut records = self.records.lock().unwrap();
        records.push_back(record);
        while records.len() > MAX_AUDIT_RECORDS {
            records.pop_front();
        }

        operation_id
    }

    /// All records for one principal token, oldest first.
    pub fn records_for_token(&self, token: &str) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.context.token == token)
            .cloned()
            .collect()
    }

    /// Global summary across the retained window.
    pub fn summary(&self) -> AuditSummary {
        let records = self.records.lock().unwrap();

        let total_operations = records.len();
        let successful_operations = records.iter().filter(|r| r.success).count();
        let failed_operations = total_operations - successful_operations;

        let mut principals: BTreeMap<String, PrincipalAuditStats> = BTreeMap::new();
        for record in records.iter() {
            let stats = principals
                .entry(record.context.business_name.clone())
                .or_default();
            stats.total_operations += 1;
            stats.file_kinds.insert(record.file_kind.clone());
            if record.success {
                stats.successful_operations += 1;
            } else {
                stats.failed_operations += 1;
            }
        }

        AuditSummary {
            total_operations,
            successful_operations,
            failed_operations,
            success_rate: if total_operations > 0 {
                successful_operations as f64 / total_operations as f64
            } else {
                0.0
            },
            principals,
            timestamp: Utc::now(),
        }
    }

    /// Count of retained records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("record_count", &self.len())
            .finish()
    }
}

/// Per-principal aggregate statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrincipalAuditStats {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    /// Distinct attachment kinds seen for this principal.
    pub file_kinds: BTreeSet<String>,
}

/// Global audit summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    /// successes / total; 0 when the log is empty.
    pub success_rate: f64,
    /// Aggregates keyed by business name.
    pub principals: BTreeMap<String, PrincipalAuditStats>,
    pub timestamp: DateTime<Utc>,
}
