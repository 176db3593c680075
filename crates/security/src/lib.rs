//! Security features for the BizCanvas file-processing path: token
//! validation, bounded audit logging, and filename sanitization.
//!
//! The [`SecurityGate`] validates a caller's access token and produces an
//! immutable, audited [`SecurityContext`] before any attachment is
//! processed. The [`AuditLog`] keeps a bounded trail of file operations per
//! principal.

pub mod audit;
pub mod filename;
pub mod gate;

pub use audit::{AuditLog, AuditRecord, AuditSummary, PrincipalAuditStats, MAX_AUDIT_RECORDS};
pub use filename::sanitize_filename;
pub use gate::{SecurityContext, SecurityGate, ValidationOutcome};
