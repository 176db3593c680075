//! Token validation gate for attachment processing.
//!
//! The gate maps lookup results onto a closed outcome set and, on success,
//! mints an immutable [`SecurityContext`] carrying the validated principal's
//! identity plus a fresh validation id. The gate itself does not log:
//! logging and audit-trail writes are the caller's responsibility.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bizcanvas_core::error::LookupError;
use bizcanvas_core::principal::{Principal, PrincipalLookup};

/// The closed set of validation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    TokenMissing,
    InvalidToken,
    ValidationFailed,
    DatabaseError,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Human-readable description for degraded-turn error strings.
    pub fn describe(&self, operation: &str) -> String {
        match self {
            Self::Valid => format!("{operation}: token validated"),
            Self::TokenMissing => format!("{operation}: no access token provided"),
            Self::InvalidToken => format!("{operation}: access token not recognized"),
            Self::ValidationFailed => format!("{operation}: token validation failed"),
            Self::DatabaseError => {
                format!("{operation}: profile backend unavailable, try again later")
            }
        }
    }
}

impl std::fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Valid => "valid",
            Self::TokenMissing => "token_missing",
            Self::InvalidToken => "invalid_token",
            Self::ValidationFailed => "validation_failed",
            Self::DatabaseError => "database_error",
        };
        write!(f, "{s}")
    }
}

/// Immutable validated context for one turn's file operations.
///
/// Minted once per validation; suitable for downstream audit entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    /// The validated access token.
    pub token: String,

    /// Business name of the validated principal.
    pub business_name: String,

    /// Owner name of the validated principal.
    pub owner_name: String,

    /// Industry sector of the validated principal.
    pub sector: String,

    /// The operation context this validation was requested for.
    pub operation_context: String,

    /// When the validation completed.
    pub validated_at: DateTime<Utc>,

    /// Freshly generated id for this validation.
    pub validation_id: String,
}

impl SecurityContext {
    fn mint(token: &str, principal: &Principal, operation_context: &str) -> Self {
        Self {
            token: token.into(),
            business_name: principal.business_name.clone(),
            owner_name: principal.owner_name.clone(),
            sector: principal.sector.clone(),
            operation_context: operation_context.into(),
            validated_at: Utc::now(),
            validation_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Validates access tokens against the principal lookup backend.
pub struct SecurityGate {
    lookup: Arc<dyn PrincipalLookup>,
}

impl SecurityGate {
    pub fn new(lookup: Arc<dyn PrincipalLookup>) -> Self {
        Self { lookup }
    }

    /// Validate a caller token for the given operation context.
    ///
    /// An absent (or empty) token is a distinct outcome from an unknown one.
    /// Lookup-layer connectivity failures map to `DatabaseError`; all other
    /// lookup failures map to `ValidationFailed`. Neither panics nor
    /// propagates — every path yields an outcome. Callers validate at most
    /// once per turn and reuse the returned context.
    pub async fn validate(
        &self,
        token: Option<&str>,
        context_label: &str,
    ) -> (ValidationOutcome, Option<SecurityContext>) {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return (ValidationOutcome::TokenMissing, None),
        };

        match self.lookup.lookup(token).await {
            Ok(Some(principal)) => {
                let context = SecurityContext::mint(token, &principal, context_label);
                (ValidationOutcome::Valid, Some(context))
            }
            Ok(None) => (ValidationOutcome::InvalidToken, None),
            Err(LookupError::Connectivity(_)) => (ValidationOutcome::DatabaseError, None),
            Err(LookupError::Operation(_)) => (ValidationOutcome::ValidationFailed, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// A lookup stub with a scripted response.
    struct ScriptedLookup {
        result: std::result::Result<Option<Principal>, LookupError>,
    }

    #[async_trait]
    impl PrincipalLookup for ScriptedLookup {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn lookup(
            &self,
            _token: &str,
        ) -> std::result::Result<Option<Principal>, LookupError> {
            self.result.clone()
        }
    }

    fn principal() -> Principal {
        Principal {
            token: "Bloom & Co Florist".into(),
            owner_name: "Isabella Rodriguez".into(),
            business_name: "Bloom & Co Florist".into(),
            sector: "Retail & Events".into(),
            business_type: "Boutique Florist".into(),
            size: "Small (4 employees)".into(),
            challenges: vec![],
            goals: vec![],
            current_focus: String::new(),
        }
    }

    fn gate(result: std::result::Result<Option<Principal>, LookupError>) -> SecurityGate {
        SecurityGate::new(Arc::new(ScriptedLookup { result }))
    }

    #[tokio::test]
    async fn missing_token_is_distinct_outcome() {
        let gate = gate(Ok(Some(principal())));
        let (outcome, context) = gate.validate(None, "file_processing").await;
        assert_eq!(outcome, ValidationOutcome::TokenMissing);
        assert!(context.is_none());

        let (outcome, _) = gate.validate(Some(""), "file_processing").await;
        assert_eq!(outcome, ValidationOutcome::TokenMissing);
    }

    #[tokio::test]
    async fn unknown_token_is_invalid_not_missing() {
        let gate = gate(Ok(None));
        let (outcome, context) = gate.validate(Some("nope"), "file_processing").await;
        assert_eq!(outcome, ValidationOutcome::InvalidToken);
        assert!(context.is_none());
    }

    #[tokio::test]
    async fn valid_token_mints_context() {
        let gate = gate(Ok(Some(principal())));
        let (outcome, context) = gate
            .validate(Some("Bloom & Co Florist"), "file_upload")
            .await;
        assert_eq!(outcome, ValidationOutcome::Valid);

        let context = context.unwrap();
        assert_eq!(context.business_name, "Bloom & Co Florist");
        assert_eq!(context.owner_name, "Isabella Rodriguez");
        assert_eq!(context.operation_context, "file_upload");
        assert!(!context.validation_id.is_empty());
    }

    #[tokio::test]
    async fn fresh_validation_id_per_call() {
        let gate = gate(Ok(Some(principal())));
        let (_, a) = gate.validate(Some("t"), "x").await;
        let (_, b) = gate.validate(Some("t"), "x").await;
        assert_ne!(a.unwrap().validation_id, b.unwrap().validation_id);
    }

    #[tokio::test]
    async fn connectivity_failure_maps_to_database_error() {
        let gate = gate(Err(LookupError::Connectivity("refused".into())));
        let (outcome, _) = gate.validate(Some("t"), "file_processing").await;
        assert_eq!(outcome, ValidationOutcome::DatabaseError);
    }

    #[tokio::test]
    async fn operation_failure_maps_to_validation_failed() {
        let gate = gate(Err(LookupError::Operation("bad document".into())));
        let (outcome, _) = gate.validate(Some("t"), "file_processing").await;
        assert_eq!(outcome, ValidationOutcome::ValidationFailed);
    }

    #[test]
    fn describe_mentions_operation() {
        let text = ValidationOutcome::DatabaseError.describe("file_processing");
        assert!(text.contains("file_processing"));
        assert!(text.contains("unavailable"));
    }
}
