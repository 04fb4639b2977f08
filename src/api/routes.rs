/*
 * Responsibility
 * - URL structure of the API (full paths, no nesting)
 * - Full paths keep the access middleware's route classification on the real URI
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    auth::{sign_in, sign_up},
    profile::profile,
    test::all_access,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/test/all", get(all_access))
        .route("/api/profile", get(profile))
}
