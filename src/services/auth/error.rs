use thiserror::Error;

use crate::services::auth::token_codec::ValidationError;

/// Every way authentication can fail. All variants are terminal for the request and
/// surface as 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authentication credential is missing")]
    MissingCredential,
    #[error("invalid access token: {0}")]
    InvalidToken(ValidationError),
    // login-time only
    #[error("bad credentials")]
    BadCredentials,
    // login-time only
    #[error("credential store unavailable")]
    StoreUnavailable,
}

impl AuthError {
    /// Stable machine-readable name, used as the `error` field of the 401 body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MissingCredential",
            Self::InvalidToken(reason) => reason.kind(),
            Self::BadCredentials => "BadCredentials",
            Self::StoreUnavailable => "StoreUnavailable",
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(reason: ValidationError) -> Self {
        Self::InvalidToken(reason)
    }
}
