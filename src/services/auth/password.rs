//! One-way password hashing for login-time credential checks (bcrypt).
//!
//! The work factor lives inside each stored hash (`$2b$<cost>$...`), so raising the
//! configured cost never invalidates hashes created with a lower one.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt cost must be between {min} and {max}, got {0}", min = MIN_COST, max = MAX_COST)]
    InvalidCost(u32),
    #[error("password exceeds {max} bytes", max = MAX_PASSWORD_BYTES)]
    TooLong,
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Stored credential hash. Opaque: never logged, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Work factor encoded in the hash, if it is a well-formed bcrypt hash.
    pub fn cost(&self) -> Option<u32> {
        self.0.split('$').nth(2).and_then(|c| c.parse().ok())
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordVerifier {
    cost: u32,
}

impl PasswordVerifier {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Salted bcrypt hash at the configured cost. CPU bound; call from a blocking task.
    pub fn hash(&self, plaintext: &str) -> Result<CredentialHash, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        let hash = bcrypt::hash(plaintext, self.cost)?;
        Ok(CredentialHash(hash))
    }

    /// Constant-time comparison (bcrypt recomputes the full digest and compares it with
    /// `subtle`). A malformed stored hash never verifies.
    pub fn verify(&self, plaintext: &str, stored: &CredentialHash) -> bool {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match bcrypt::verify(plaintext, stored.as_str()) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(error = %e, "stored credential hash is not a valid bcrypt hash");
                false
            }
        }
    }

    /// True when the stored hash was created with a lower cost than configured.
    pub fn needs_rehash(&self, stored: &CredentialHash) -> bool {
        stored.cost().is_some_and(|cost| cost < self.cost)
    }
}
