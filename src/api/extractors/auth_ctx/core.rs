use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::{AuthError, AuthenticatedPrincipal, AuthenticationContext};

/// Handler-side view of the authenticated principal.
///
/// The access middleware stores an `AuthenticationContext` in request extensions.
/// Only `Authenticated` contexts satisfy this extractor; an anonymous context (public
/// route) or a missing one (middleware not applied) is rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthCtx(pub AuthenticatedPrincipal);

impl<S> FromRequestParts<S> for AuthCtx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticationContext>()
            .and_then(AuthenticationContext::principal)
            .cloned()
            .map(AuthCtx)
            .ok_or(AppError::Unauthorized(AuthError::MissingCredential))
    }
}
