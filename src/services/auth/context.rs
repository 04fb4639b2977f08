/*
 * Responsibility
 * - Request-scoped authentication result produced by the gatekeeper
 * - Stored in request extensions only; dropped with the request
 */
use crate::services::auth::token_codec::ClaimSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationContext {
    /// Public route: no credential was inspected.
    Anonymous,
    /// A token was validated during this request.
    Authenticated(AuthenticatedPrincipal),
}

impl AuthenticationContext {
    pub fn principal(&self) -> Option<&AuthenticatedPrincipal> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(principal) => Some(principal),
        }
    }
}

/// Identity asserted by a validated token.
///
/// - `token_id` is the token's `jti` (audit/correlation only; there is no denylist)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub subject: String,
    pub roles: Vec<String>,
    pub token_id: String,
    pub expires_at: i64,
}

impl From<ClaimSet> for AuthenticatedPrincipal {
    fn from(claims: ClaimSet) -> Self {
        Self {
            subject: claims.subject,
            roles: claims.roles,
            token_id: claims.token_id,
            expires_at: claims.expires_at,
        }
    }
}
