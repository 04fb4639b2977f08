//! Runs the authentication gatekeeper on every request and hands the result to handlers
//! through request extensions.
//!
//! - Public routes and CORS preflights continue as `AuthenticationContext::Anonymous`
//! - Protected routes continue only with a validated token
//! - Any failure ends the request here with a 401 (FailureResponder)

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Apply the authentication layer to every route registered on `router` so far.
///
/// ```ignore
/// let app = api::routes();
/// let app = middleware::auth::access::apply(app, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 from_fn cannot take a State extractor, so pass state explicitly.
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = match state.gatekeeper.authenticate(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::warn!(
                kind = err.kind(),
                method = %req.method(),
                path = %req.uri().path(),
                "authentication failed"
            );
            return Err(err.into());
        }
    };

    if let Some(principal) = ctx.principal() {
        tracing::debug!(subject = %principal.subject, jti = %principal.token_id, "authenticated");
    }

    // middleware -> extractor
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
