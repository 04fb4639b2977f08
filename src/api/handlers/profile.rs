/*
 * Responsibility
 * - GET /api/profile: the caller's identity as asserted by the access token
 */
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::extractors::AuthCtx;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub roles: Vec<String>,
    pub token_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn profile(AuthCtx(principal): AuthCtx) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        expires_at: DateTime::from_timestamp(principal.expires_at, 0),
        username: principal.subject,
        roles: principal.roles,
        token_id: principal.token_id,
    })
}
