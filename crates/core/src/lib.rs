//! # BizCanvas Core
//!
//! Domain types, traits, and error definitions for the BizCanvas advisory
//! conversation service. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM provider, principal lookup, checkpoint
//! store, trace sink) is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod attachment;
pub mod checkpoint;
pub mod error;
pub mod expert;
pub mod message;
pub mod principal;
pub mod provider;
pub mod trace;

// Re-export key types at crate root for ergonomics
pub use attachment::{Attachment, AttachmentKind};
pub use checkpoint::{Checkpoint, CheckpointStore, ThreadLease};
pub use error::{Error, Result};
pub use expert::{ExpertCatalog, ExpertProfile};
pub use message::{Message, Role, ThreadId};
pub use principal::{Principal, PrincipalLookup};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use trace::{TraceEvent, TraceOutcome, TraceSink};
