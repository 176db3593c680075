//! In-memory business profile store.
//!
//! Implements the [`PrincipalLookup`] collaborator contract plus the CRUD
//! surface the gateway exposes. A fault-injection switch flips the store
//! into connectivity-failure or operation-failure mode so the security
//! gate's outcome mapping can be exercised without a real backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use bizcanvas_core::error::LookupError;
use bizcanvas_core::principal::{Principal, PrincipalLookup};

/// Simulated backend health for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    #[default]
    Healthy,
    /// Every call fails with a connectivity error.
    Connectivity,
    /// Every call fails with an operation error.
    Operation,
}

/// Errors from the profile CRUD surface.
#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("Profile with token '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// An in-memory profile store keyed by access token.
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, Principal>>>,
    fault: Mutex<FaultMode>,
}

impl InMemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            fault: Mutex::new(FaultMode::Healthy),
        }
    }

    /// Create a store pre-loaded with the built-in demo profiles.
    pub async fn seeded() -> Self {
        let store = Self::new();
        store.seed().await;
        store
    }

    /// Load the built-in demo profiles into this store.
    pub async fn seed(&self) {
        let mut map = self.profiles.write().await;
        for profile in seed_profiles() {
            map.insert(profile.token.clone(), profile);
        }
        debug!(count = map.len(), "Seeded business profiles");
    }

    /// Switch the simulated backend health.
    pub fn set_fault_mode(&self, mode: FaultMode) {
        *self.fault.lock().unwrap() = mode;
    }

    fn check_fault(&self) -> std::result::Result<(), LookupError> {
        match *self.fault.lock().unwrap() {
            FaultMode::Healthy => Ok(()),
            FaultMode::Connectivity => Err(LookupError::Connectivity(
                "profile backend unreachable".into(),
            )),
            FaultMode::Operation => {
                Err(LookupError::Operation("profile backend rejected query".into()))
            }
        }
    }

    /// Create a new profile. Fails if the token is already registered.
    pub async fn create(&self, profile: Principal) -> std::result::Result<(), ProfileStoreError> {
        self.check_fault()?;
        let mut map = self.profiles.write().await;
        if map.contains_key(&profile.token) {
            return Err(ProfileStoreError::AlreadyExists(profile.token));
        }
        map.insert(profile.token.clone(), profile);
        Ok(())
    }

    /// Replace a profile. Returns false when the token is unknown.
    pub async fn update(
        &self,
        token: &str,
        profile: Principal,
    ) -> std::result::Result<bool, LookupError> {
        self.check_fault()?;
        let mut map = self.profiles.write().await;
        if !map.contains_key(token) {
            return Ok(false);
        }
        map.insert(token.to_string(), profile);
        Ok(true)
    }

    /// Delete a profile. Returns false when the token is unknown.
    pub async fn delete(&self, token: &str) -> std::result::Result<bool, LookupError> {
        self.check_fault()?;
        Ok(self.profiles.write().await.remove(token).is_some())
    }

    /// All profiles, sorted by business name.
    pub async fn all(&self) -> std::result::Result<Vec<Principal>, LookupError> {
        self.check_fault()?;
        let mut profiles: Vec<_> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| a.business_name.cmp(&b.business_name));
        Ok(profiles)
    }

    /// Number of stored profiles.
    pub async fn count(&self) -> std::result::Result<usize, LookupError> {
        self.check_fault()?;
        Ok(self.profiles.read().await.len())
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrincipalLookup for InMemoryProfileStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn lookup(&self, token: &str) -> std::result::Result<Option<Principal>, LookupError> {
        self.check_fault()?;
        Ok(self.profiles.read().await.get(token).cloned())
    }
}

/// Representative client profiles used for demos and tests.
fn seed_profiles() -> Vec<Principal> {
    vec![
        Principal {
            token: "Diva Rides".into(),
            owner_name: "Diana Walker".into(),
            business_name: "Diva Rides".into(),
            sector: "Independent ride-sharing service".into(),
            business_type: "Private ride-sharing service using personal SUVs for \
                            pre-scheduled and on-demand rides"
                .into(),
            size: "Small (2 employees)".into(),
            challenges: vec![
                "Inconsistent customer flow and unreliable income".into(),
                "Customer acquisition beyond word-of-mouth".into(),
                "Low profit margins against Uber and Lyft pricing".into(),
                "Two vehicles but no consistent drivers".into(),
            ],
            goals: vec![
                "Establish a predictable revenue stream covering living expenses".into(),
                "Scale to a 4-6 vehicle fleet with hired drivers".into(),
            ],
            current_focus: "Moving from a general taxi service to a specialized \
                            transportation provider for commuters and elderly riders"
                .into(),
        },
        Principal {
            token: "TechFix Solutions".into(),
            owner_name: "Marcus Chen".into(),
            business_name: "TechFix Solutions".into(),
            sector: "Technology Services".into(),
            business_type: "IT Repair Shop".into(),
            size: "Small (3 employees)".into(),
            challenges: vec![
                "Competition from big box stores".into(),
                "Customer acquisition costs".into(),
                "Unpredictable revenue streams".into(),
            ],
            goals: vec![
                "Develop recurring revenue streams".into(),
                "Expand service offerings".into(),
                "Build corporate client base".into(),
            ],
            current_focus: "Exploring subscription-based support models and managed IT services"
                .into(),
        },
        Principal {
            token: "Bloom & Co Florist".into(),
            owner_name: "Isabella Rodriguez".into(),
            business_name: "Bloom & Co Florist".into(),
            sector: "Retail & Events".into(),
            business_type: "Boutique Florist".into(),
            size: "Small (4 employees)".into(),
            challenges: vec![
                "Inventory management with perishables".into(),
                "Wedding season dependency".into(),
                "Rising wholesale flower costs".into(),
            ],
            goals: vec![
                "Diversify beyond weddings".into(),
                "Create subscription flower service".into(),
                "Expand corporate partnerships".into(),
            ],
            current_focus: "Developing year-round revenue streams and reducing waste through \
                            better demand forecasting"
                .into(),
        },
        Principal {
            token: "FitLife Personal Training".into(),
            owner_name: "David Thompson".into(),
            business_name: "FitLife Personal Training".into(),
            sector: "Health & Fitness".into(),
            business_type: "Personal Training Studio".into(),
            size: "Small (6 trainers)".into(),
            challenges: vec![
                "Client retention after initial goals".into(),
                "Limited physical space for growth".into(),
                "Seasonal membership fluctuations".into(),
            ],
            goals: vec![
                "Launch online training programs".into(),
                "Increase average client lifetime value".into(),
                "Develop corporate wellness partnerships".into(),
            ],
            current_focus: "Creating hybrid online/offline training packages and building \
                            stronger client relationships"
                .into(),
        },
        Principal {
            token: "Craftworks Furniture".into(),
            owner_name: "Elena Vasquez".into(),
            business_name: "Craftworks Furniture".into(),
            sector: "Manufacturing & Retail".into(),
            business_type: "Custom Furniture Workshop".into(),
            size: "Medium (12 employees)".into(),
            challenges: vec![
                "Long production lead times".into(),
                "Raw material cost volatility".into(),
                "Scaling custom work processes".into(),
            ],
            goals: vec![
                "Streamline production workflow".into(),
                "Develop semi-custom product lines".into(),
                "Expand into commercial markets".into(),
            ],
            current_focus: "Balancing custom craftsmanship with scalable business processes"
                .into(),
        },
        Principal {
            token: "GreenThumb Landscaping".into(),
            owner_name: "James Wilson".into(),
            business_name: "GreenThumb Landscaping".into(),
            sector: "Home & Garden Services".into(),
            business_type: "Landscaping Company".into(),
            size: "Medium (15 employees)".into(),
            challenges: vec![
                "Weather-dependent operations".into(),
                "Seasonal workforce management".into(),
                "Equipment maintenance costs".into(),
            ],
            goals: vec![
                "Develop year-round service offerings".into(),
                "Increase commercial contract revenue".into(),
                "Improve crew efficiency and scheduling".into(),
            ],
            current_focus: "Creating maintenance contracts and exploring indoor plant services \
                            to reduce seasonal dependency"
                .into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_seeded_profile() {
        let store = InMemoryProfileStore::seeded().await;
        let profile = store.lookup("TechFix Solutions").await.unwrap().unwrap();
        assert_eq!(profile.owner_name, "Marcus Chen");
    }

    #[tokio::test]
    async fn lookup_unknown_token_is_none_not_error() {
        let store = InMemoryProfileStore::seeded().await;
        assert!(store.lookup("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_token() {
        let store = InMemoryProfileStore::seeded().await;
        let existing = store.lookup("Diva Rides").await.unwrap().unwrap();
        let err = store.create(existing).await.unwrap_err();
        assert!(matches!(err, ProfileStoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_and_delete_report_presence() {
        let store = InMemoryProfileStore::seeded().await;
        let mut profile = store.lookup("Diva Rides").await.unwrap().unwrap();
        profile.size = "Small (4 employees)".into();

        assert!(store.update("Diva Rides", profile.clone()).await.unwrap());
        assert!(!store.update("ghost", profile).await.unwrap());

        assert!(store.delete("Diva Rides").await.unwrap());
        assert!(!store.delete("Diva Rides").await.unwrap());
    }

    #[tokio::test]
    async fn all_sorted_by_business_name() {
        let store = InMemoryProfileStore::seeded().await;
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), store.count().await.unwrap());
        let names: Vec<_> = all.iter().map(|p| p.business_name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn fault_modes_surface_matching_errors() {
        let store = InMemoryProfileStore::seeded().await;

        store.set_fault_mode(FaultMode::Connectivity);
        assert!(matches!(
            store.lookup("TechFix Solutions").await,
            Err(LookupError::Connectivity(_))
        ));

        store.set_fault_mode(FaultMode::Operation);
        assert!(matches!(
            store.count().await,
            Err(LookupError::Operation(_))
        ));

        store.set_fault_mode(FaultMode::Healthy);
        assert!(store.lookup("TechFix Solutions").await.unwrap().is_some());
    }
}
