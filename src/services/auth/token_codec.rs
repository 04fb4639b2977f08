//! Signed access tokens (JWT): issue and validate.
//!
//! Validation order is fixed: signature integrity first, claim contents second, expiry
//! last. Any failing step rejects the whole token; there is no partially trusted result.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::services::auth::credential_store::Principal;

/// Shortest accepted HS256 secret, in bytes (256 bits).
pub const MIN_HMAC_SECRET_LEN: usize = 32;

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    SignatureMismatch,
    #[error("token has expired")]
    Expired,
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed => "Malformed",
            Self::SignatureMismatch => "SignatureMismatch",
            Self::Expired => "Expired",
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("signing key is not available (verify-only codec)")]
    SigningKeyUnavailable,
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

/// Key material problems. These are start-up errors, never per-request ones.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("HS256 secret must be at least {min} bytes, got {0}", min = MIN_HMAC_SECRET_LEN)]
    WeakSecret(usize),
    #[error("invalid Ed25519 private key pem: {0}")]
    PrivatePem(#[source] jsonwebtoken::errors::Error),
    #[error("invalid Ed25519 public key pem: {0}")]
    PublicPem(#[source] jsonwebtoken::errors::Error),
    #[error("Ed25519 private and public keys do not form a pair")]
    KeyPairMismatch,
}

/// Decoded, validated token contents. Doubles as the JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "jti")]
    pub token_id: String,
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: ClaimSet,
}

impl IssuedToken {
    /// Seconds between issue and expiry.
    pub fn expires_in(&self) -> u64 {
        (self.claims.expires_at - self.claims.issued_at).max(0) as u64
    }
}

/// JWT issuer + verifier.
///
/// - Built once at start-up and shared read-only (`Arc<TokenCodec>`).
/// - Key material is intentionally not printable via Debug.
/// - A codec built without a private key can validate but not issue.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
    validation: Validation,
    leeway_seconds: i64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("can_issue", &self.encoding_key.is_some())
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenCodec {
    /// HS256 with a shared secret.
    pub fn hmac(secret: &[u8], leeway_seconds: u64) -> Result<Self, KeyError> {
        if secret.len() < MIN_HMAC_SECRET_LEN {
            return Err(KeyError::WeakSecret(secret.len()));
        }

        Ok(Self::from_parts(
            Algorithm::HS256,
            Some(EncodingKey::from_secret(secret)),
            DecodingKey::from_secret(secret),
            leeway_seconds,
        ))
    }

    /// EdDSA (Ed25519). `private_key_pem` is PKCS#8, `public_key_pem` is SPKI.
    /// Omit the private key for a verify-only codec.
    pub fn ed25519(
        private_key_pem: Option<&str>,
        public_key_pem: &str,
        leeway_seconds: u64,
    ) -> Result<Self, KeyError> {
        let encoding_key = private_key_pem
            .map(|pem| EncodingKey::from_ed_pem(pem.as_bytes()))
            .transpose()
            .map_err(|e| {
                warn!(error = %e, "failed to parse token private key PEM (expected Ed25519 PKCS#8 PEM)");
                KeyError::PrivatePem(e)
            })?;

        let decoding_key = DecodingKey::from_ed_pem(public_key_pem.as_bytes()).map_err(|e| {
            warn!(error = %e, "failed to parse token public key PEM");
            KeyError::PublicPem(e)
        })?;

        let codec = Self::from_parts(Algorithm::EdDSA, encoding_key, decoding_key, leeway_seconds);
        codec.check_key_pair()?;

        Ok(codec)
    }

    /// Sign a throwaway claim set with the private key and verify it with the public one.
    fn check_key_pair(&self) -> Result<(), KeyError> {
        let Some(encoding_key) = &self.encoding_key else {
            return Ok(());
        };

        let now = Utc::now().timestamp();
        let claims = ClaimSet {
            subject: "key-pair-check".to_string(),
            roles: Vec::new(),
            issued_at: now,
            expires_at: now + 60,
            token_id: Uuid::new_v4().to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(self.algorithm), &claims, encoding_key)
            .map_err(KeyError::PrivatePem)?;

        jsonwebtoken::decode::<ClaimSet>(&token, &self.decoding_key, &self.validation)
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "token private key does not match the public key");
                KeyError::KeyPairMismatch
            })
    }

    fn from_parts(
        algorithm: Algorithm,
        encoding_key: Option<EncodingKey>,
        decoding_key: DecodingKey,
        leeway_seconds: u64,
    ) -> Self {
        let mut validation = Validation::new(algorithm);
        // Expiry is checked after decoding, against an explicit clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = ["exp", "sub"].into_iter().map(String::from).collect();

        Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn can_issue(&self) -> bool {
        self.encoding_key.is_some()
    }

    pub fn issue(&self, principal: &Principal, validity: Duration) -> Result<IssuedToken, EncodingError> {
        self.issue_at(principal, validity, Utc::now())
    }

    pub fn issue_at(
        &self,
        principal: &Principal,
        validity: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, EncodingError> {
        let encoding_key = self
            .encoding_key
            .as_ref()
            .ok_or(EncodingError::SigningKeyUnavailable)?;

        let claims = ClaimSet {
            subject: principal.id().to_string(),
            roles: principal.roles().to_vec(),
            issued_at: now.timestamp(),
            expires_at: now
                .checked_add_signed(validity)
                .ok_or(EncodingError::ExpiryOutOfRange)?
                .timestamp(),
            token_id: Uuid::new_v4().to_string(),
        };

        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());

        let token = jsonwebtoken::encode(&header, &claims, encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign access token");
            EncodingError::Sign(e)
        })?;

        Ok(IssuedToken { token, claims })
    }

    pub fn validate(&self, token: &str) -> Result<ClaimSet, ValidationError> {
        self.validate_at(token, Utc::now())
    }

    /// Valid iff the signature verifies, the claims are well formed and
    /// `now < exp + leeway`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, ValidationError> {
        let data = jsonwebtoken::decode::<ClaimSet>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let reason = reason_for(e.kind());
                debug!(error = %e, reason = reason.kind(), "access token rejected");
                reason
            })?;
        let claims = data.claims;

        if claims.subject.trim().is_empty() || claims.expires_at < claims.issued_at {
            return Err(ValidationError::Malformed);
        }

        if now.timestamp() >= claims.expires_at.saturating_add(self.leeway_seconds) {
            debug!(jti = %claims.token_id, exp = claims.expires_at, "access token expired");
            return Err(ValidationError::Expired);
        }

        Ok(claims)
    }
}

fn reason_for(kind: &ErrorKind) -> ValidationError {
    match kind {
        ErrorKind::InvalidSignature => ValidationError::SignatureMismatch,
        ErrorKind::ExpiredSignature => ValidationError::Expired,
        _ => ValidationError::Malformed,
    }
}
