//! Maps an authentication failure to the HTTP response the client sees.
//!
//! Every failure is a 401 with a `WWW-Authenticate: Bearer` challenge. The body names the
//! failure kind; it never echoes the presented token.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::ErrorBody;
use crate::services::auth::AuthError;
use crate::services::auth::token_codec::ValidationError;

pub struct FailureResponder;

impl FailureResponder {
    pub fn respond(err: &AuthError) -> Response {
        let body = ErrorBody {
            error: err.kind(),
            message: message_for(err).to_string(),
        };

        let mut res = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        let headers = res.headers_mut();
        headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        res
    }
}

fn message_for(err: &AuthError) -> &'static str {
    match err {
        AuthError::MissingCredential => "full authentication is required to access this resource",
        AuthError::InvalidToken(ValidationError::Malformed) => "access token is malformed",
        AuthError::InvalidToken(ValidationError::SignatureMismatch) => {
            "access token signature is invalid"
        }
        AuthError::InvalidToken(ValidationError::Expired) => "access token has expired",
        AuthError::BadCredentials => "bad credentials",
        AuthError::StoreUnavailable => "authentication is temporarily unavailable",
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body_of(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn every_failure_is_a_401_challenge() {
        let all = [
            AuthError::MissingCredential,
            AuthError::InvalidToken(ValidationError::Malformed),
            AuthError::InvalidToken(ValidationError::SignatureMismatch),
            AuthError::InvalidToken(ValidationError::Expired),
            AuthError::BadCredentials,
            AuthError::StoreUnavailable,
        ];

        for err in all {
            let res = FailureResponder::respond(&err);
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{err:?}");
            assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
            assert_eq!(res.headers()[header::CACHE_CONTROL], "no-store");

            let body = body_of(res).await;
            assert_eq!(body["error"], err.kind());
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn expired_token_body() {
        let res = FailureResponder::respond(&AuthError::InvalidToken(ValidationError::Expired));

        let body = body_of(res).await;
        assert_eq!(body["error"], "Expired");
        assert_eq!(body["message"], "access token has expired");
    }
}
