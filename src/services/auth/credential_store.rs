//! Principal lookup used at login time only (never per request).
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::services::auth::password::CredentialHash;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer errors.
///
/// Kept independent from `AppError` so the login flow decides the failure policy
/// (it fails closed on `Unavailable`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("principal already exists: {0}")]
    Conflict(String),
    #[error("principal not found: {0}")]
    NotFound(String),
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// An identity known to the credential store.
///
/// Roles are kept as a sorted set so tokens built from the same principal are stable.
#[derive(Debug, Clone)]
pub struct Principal {
    id: String,
    roles: Vec<String>,
    credential_hash: CredentialHash,
}

impl Principal {
    pub fn new(
        id: impl Into<String>,
        roles: impl IntoIterator<Item = String>,
        credential_hash: CredentialHash,
    ) -> Self {
        let roles: BTreeSet<String> = roles.into_iter().collect();
        Self {
            id: id.into(),
            roles: roles.into_iter().collect(),
            credential_hash,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn credential_hash(&self) -> &CredentialHash {
        &self.credential_hash
    }
}

/// Credential lookup interface.
///
/// Calls may suspend (remote directory, database); the login flow bounds every call
/// with a timeout.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    // Backend name for logging.
    fn backend_name(&self) -> &'static str;

    async fn find(&self, id: &str) -> StoreResult<Option<Principal>>;

    // Fails with `Conflict` when the identifier is taken.
    async fn insert(&self, principal: Principal) -> StoreResult<()>;

    // Replace the stored hash (work factor upgrades).
    async fn update_credential_hash(&self, id: &str, hash: CredentialHash) -> StoreResult<()>;
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    principals: RwLock<HashMap<String, Principal>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, id: &str) -> StoreResult<Option<Principal>> {
        Ok(self.principals.read().await.get(id).cloned())
    }

    async fn insert(&self, principal: Principal) -> StoreResult<()> {
        let mut principals = self.principals.write().await;
        if principals.contains_key(&principal.id) {
            return Err(StoreError::Conflict(principal.id));
        }
        principals.insert(principal.id.clone(), principal);
        Ok(())
    }

    async fn update_credential_hash(&self, id: &str, hash: CredentialHash) -> StoreResult<()> {
        let mut principals = self.principals.write().await;
        let principal = principals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        principal.credential_hash = hash;
        Ok(())
    }
}
