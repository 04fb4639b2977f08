use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::services::auth::credential_store::{CredentialStore, Principal, StoreError};
use crate::services::auth::error::AuthError;
use crate::services::auth::password::{CredentialHash, PasswordVerifier};
use crate::services::auth::token_codec::{IssuedToken, TokenCodec};

pub const DEFAULT_ROLE: &str = "user";

/// Login-time authentication: credential store lookup + password check + token issue.
///
/// - Every store call is bounded by `store_timeout`; a timeout fails closed.
/// - bcrypt runs on the blocking pool so it never stalls the async workers.
/// - Failures are terminal; nothing is retried.
pub struct LoginService {
    store: Arc<dyn CredentialStore>,
    passwords: Arc<PasswordVerifier>,
    codec: Arc<TokenCodec>,
    token_ttl: chrono::Duration,
    store_timeout: Duration,
    // Verified against when the principal does not exist, so unknown users cost the
    // same bcrypt work as known ones.
    dummy_hash: CredentialHash,
}

impl std::fmt::Debug for LoginService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginService")
            .field("store", &self.store.backend_name())
            .field("token_ttl", &self.token_ttl)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl LoginService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: Arc<PasswordVerifier>,
        codec: Arc<TokenCodec>,
        token_ttl: chrono::Duration,
        store_timeout: Duration,
    ) -> Result<Self, AppError> {
        let dummy_hash = passwords.hash("dummy-password-for-unknown-users").map_err(|e| {
            error!(error = %e, "failed to prepare dummy credential hash");
            AppError::Internal
        })?;

        Ok(Self {
            store,
            passwords,
            codec,
            token_ttl,
            store_timeout,
            dummy_hash,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AppError> {
        let found = self.bounded("find", self.store.find(username)).await?;

        let Some(principal) = found else {
            self.verify_password(password, self.dummy_hash.clone()).await?;
            debug!(username = %username, "login for unknown principal");
            return Err(AuthError::BadCredentials.into());
        };

        let matched = self
            .verify_password(password, principal.credential_hash().clone())
            .await?;
        if !matched {
            warn!(username = %username, "login with wrong password");
            return Err(AuthError::BadCredentials.into());
        }

        if self.passwords.needs_rehash(principal.credential_hash()) {
            self.upgrade_hash(&principal, password).await;
        }

        let issued = self.codec.issue(&principal, self.token_ttl).map_err(|e| {
            error!(username = %username, error = %e, "failed to issue access token");
            AppError::Internal
        })?;

        info!(
            subject = %issued.claims.subject,
            jti = %issued.claims.token_id,
            expires_at = issued.claims.expires_at,
            "issued access token"
        );

        Ok(issued)
    }

    /// Register a new principal with the default role.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), AppError> {
        let hash = self.hash_password(password).await?;
        let principal = Principal::new(username, [DEFAULT_ROLE.to_string()], hash);

        self.bounded("insert", self.store.insert(principal)).await?;

        info!(username = %username, "registered principal");
        Ok(())
    }

    /// Re-hash at the configured cost. Failures are logged; the login still succeeds.
    async fn upgrade_hash(&self, principal: &Principal, password: &str) {
        let hash = match self.hash_password(password).await {
            Ok(hash) => hash,
            Err(_) => return,
        };

        match self
            .bounded(
                "update_credential_hash",
                self.store.update_credential_hash(principal.id(), hash),
            )
            .await
        {
            Ok(()) => debug!(username = %principal.id(), "upgraded credential hash work factor"),
            Err(e) => warn!(username = %principal.id(), error = %e, "failed to upgrade credential hash"),
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(|e| {
                if matches!(e, StoreError::Unavailable(_)) {
                    error!(backend = self.store.backend_name(), op, error = %e, "credential store call failed");
                }
                AppError::from(e)
            }),
            Err(_) => {
                warn!(
                    backend = self.store.backend_name(),
                    op,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "credential store call timed out"
                );
                Err(AuthError::StoreUnavailable.into())
            }
        }
    }

    async fn verify_password(&self, password: &str, hash: CredentialHash) -> Result<bool, AppError> {
        let passwords = Arc::clone(&self.passwords);
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
            .await
            .map_err(|e| {
                error!(error = %e, "password verification task failed");
                AppError::Internal
            })
    }

    async fn hash_password(&self, password: &str) -> Result<CredentialHash, AppError> {
        let passwords = Arc::clone(&self.passwords);
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| {
                error!(error = %e, "password hashing task failed");
                AppError::Internal
            })?
            .map_err(|e| {
                error!(error = %e, "failed to hash password");
                AppError::Internal
            })
    }
}
