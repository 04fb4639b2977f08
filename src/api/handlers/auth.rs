/*
 * Responsibility
 * - POST /api/auth/signin, POST /api/auth/signup
 * - Public routes: the access middleware lets them through without a token
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    api::dto::auth::{MessageResponse, SignInRequest, SignInResponse, SignUpRequest},
    error::AppError,
    state::AppState,
};

pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>, AppError> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    let issued = state.login.login(req.username.trim(), &req.password).await?;

    Ok(Json(issued.into()))
}

pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    state.login.register(&req.username, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "user registered successfully".to_string(),
        }),
    ))
}
