//! Principal (business profile) domain type and lookup contract.
//!
//! A principal is the validated identity behind a caller's access token:
//! the business profile the expert persona is advising. Lookup backends
//! must be idempotent and side-effect-free.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// A business client profile, keyed by its access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Access token for this profile.
    pub token: String,

    /// Name of the business owner.
    pub owner_name: String,

    /// Name of the business.
    pub business_name: String,

    /// Industry sector.
    pub sector: String,

    /// Type of business (e.g., "Boutique Florist").
    pub business_type: String,

    /// Business size description.
    pub size: String,

    /// Current business challenges.
    #[serde(default)]
    pub challenges: Vec<String>,

    /// Business goals and objectives.
    #[serde(default)]
    pub goals: Vec<String>,

    /// What the business is currently focusing on.
    #[serde(default)]
    pub current_focus: String,
}

impl Principal {
    /// The owner's first name, used for direct address in prompts.
    pub fn first_name(&self) -> &str {
        self.owner_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.owner_name)
    }

    /// Render the profile as a client-profile block for generation prompts.
    pub fn to_context_string(&self) -> String {
        format!(
            "CLIENT PROFILE:\n\
             Name: {owner} (your client)\n\
             Business: {business}\n\
             Business Type: {btype} in {sector}\n\
             Team Size: {size}\n\
             Current Challenges: {challenges}\n\
             Business Goals: {goals}\n\
             Current Focus: {focus}\n\
             \n\
             Note: You are meeting with {first} for a business consultation. \
             They are your established client and you should know their name.",
            owner = self.owner_name,
            business = self.business_name,
            btype = self.business_type,
            sector = self.sector,
            size = self.size,
            challenges = self.challenges.join(", "),
            goals = self.goals.join(", "),
            focus = self.current_focus,
            first = self.first_name(),
        )
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Principal(token={}, business_name={}, sector={})",
            self.token, self.business_name, self.sector
        )
    }
}

/// The principal lookup collaborator contract.
///
/// `lookup` returns `Ok(None)` for an unknown token — that is a *distinct*
/// condition from a backend failure, and the security gate maps the two to
/// different validation outcomes.
#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Resolve a token to its principal, if any.
    async fn lookup(&self, token: &str) -> std::result::Result<Option<Principal>, LookupError>;
}
