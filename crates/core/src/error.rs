//! Error types for the BizCanvas domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all BizCanvas operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Principal lookup errors ---
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    // --- Checkpoint errors ---
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors from the principal lookup collaborator.
///
/// Connectivity failures are kept distinct from all other lookup failures so
/// the security gate can map them to separate validation outcomes.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("Lookup backend unreachable: {0}")]
    Connectivity(String),

    #[error("Lookup operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum CheckpointError {
    #[error("Checkpoint storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn lookup_error_variants_are_distinct() {
        let conn = LookupError::Connectivity("dns failure".into());
        let op = LookupError::Operation("malformed document".into());
        assert!(conn.to_string().contains("unreachable"));
        assert!(op.to_string().contains("operation failed"));
    }
}
