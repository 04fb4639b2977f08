/*
 * Responsibility
 * - Config loading -> dependency wiring -> Router assembly
 * - Middleware application (authentication gate, security headers, CORS, HTTP plumbing)
 * - axum::serve() start-up
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::auth::{InMemoryCredentialStore, build_auth_components};
use crate::state::AppState;
use crate::{api, middleware};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,auth_gatekeeper=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing (stderr may be hidden).
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    // Principals live in process memory; swap in another CredentialStore here.
    let store = Arc::new(InMemoryCredentialStore::new());

    let components = build_auth_components(config, store)?;

    Ok(components.into())
}

fn build_router(state: AppState, config: &Config) -> Router {
    async fn health() -> &'static str {
        "ok"
    }

    let router = middleware::auth::access::apply(api::routes(), state.clone())
        // Registered after the access layer: liveness probes never need a token.
        .route("/health", get(health))
        .with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::services::auth::{TokenCodec, credential_store::Principal, password::CredentialHash};

    const SECRET: &str = "router-test-secret-0123456789abcdef";

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "AUTH_JWT_SECRET" => Some(SECRET.to_string()),
            "PASSWORD_HASH_COST" => Some("4".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn app() -> Router {
        let config = test_config();
        build_router(build_state(&config).unwrap(), &config)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    async fn sign_up(app: &Router, username: &str, password: &str) -> StatusCode {
        let req = json_request(
            Method::POST,
            "/api/auth/signup",
            json!({"username": username, "password": password}),
        );
        send(app, req).await.0
    }

    async fn sign_in(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
        let req = json_request(
            Method::POST,
            "/api/auth/signin",
            json!({"username": username, "password": password}),
        );
        send(app, req).await
    }

    #[tokio::test]
    async fn protected_route_without_token_is_401() {
        let app = app();

        let res = app
            .clone()
            .oneshot(get_with_token("/api/profile", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "MissingCredential");
    }

    #[tokio::test]
    async fn public_route_without_token_is_not_401() {
        let app = app();

        // No such handler, but the path is public: routing decides, not authentication.
        let (status, _) = send(&app, json_request(Method::POST, "/api/auth/login", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, get_with_token("/api/test/all", Some("garbage"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("public content".to_string()));
    }

    #[tokio::test]
    async fn sign_up_sign_in_then_access_profile() {
        let app = app();

        assert_eq!(sign_up(&app, "alice", "secret1").await, StatusCode::CREATED);

        let (status, body) = sign_in(&app, "alice", "secret1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["username"], "alice");
        assert_eq!(body["roles"], json!(["user"]));
        assert_eq!(body["expires_in"], 86_400);

        let token = body["access_token"].as_str().unwrap().to_string();
        let (status, body) = send(&app, get_with_token("/api/profile", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["roles"], json!(["user"]));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let app = app();
        assert_eq!(sign_up(&app, "alice", "secret1").await, StatusCode::CREATED);

        let (status, wrong_password) = sign_in(&app, "alice", "secret2").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, unknown_user) = sign_in(&app, "mallory", "secret1").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert_eq!(wrong_password, unknown_user);
        assert_eq!(wrong_password["error"], "BadCredentials");
    }

    #[tokio::test]
    async fn unreadable_bodies_use_the_error_body() {
        let app = app();

        let not_json = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/signin")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, not_json).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidRequest");

        let missing_field = json_request(Method::POST, "/api/auth/signup", json!({"username": "alice"}));
        let (status, body) = send(&app, missing_field).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidRequest");

        let wrong_content_type = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/signin")
            .body(Body::from(r#"{"username":"alice","password":"secret1"}"#))
            .unwrap();
        let (status, body) = send(&app, wrong_content_type).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidRequest");
    }

    #[tokio::test]
    async fn duplicate_and_invalid_sign_up() {
        let app = app();

        assert_eq!(sign_up(&app, "alice", "secret1").await, StatusCode::CREATED);
        assert_eq!(sign_up(&app, "alice", "secret1").await, StatusCode::CONFLICT);
        assert_eq!(sign_up(&app, "al", "secret1").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn expired_or_foreign_tokens_are_rejected_with_their_reason() {
        let app = app();
        let principal = Principal::new(
            "alice",
            ["user".to_string()],
            CredentialHash::from_stored("$2b$04$unused"),
        );

        let codec = TokenCodec::hmac(SECRET.as_bytes(), 0).unwrap();
        let expired = codec
            .issue_at(&principal, Duration::minutes(1), Utc::now() - Duration::hours(1))
            .unwrap();
        let (status, body) = send(&app, get_with_token("/api/profile", Some(&expired.token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Expired");

        let foreign = TokenCodec::hmac(b"some-other-secret-0123456789abcdef", 0)
            .unwrap()
            .issue(&principal, Duration::minutes(1))
            .unwrap();
        let (status, body) = send(&app, get_with_token("/api/profile", Some(&foreign.token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "SignatureMismatch");
    }

    #[tokio::test]
    async fn health_bypasses_authentication() {
        let app = app();

        let (status, body) = send(&app, get_with_token("/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_security_headers() {
        let app = app();

        let res = app
            .clone()
            .oneshot(get_with_token("/api/profile", None))
            .await
            .unwrap();

        assert!(res.headers().contains_key("x-request-id"));
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn cors_preflight_is_not_challenged() {
        let app = app();
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/profile")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .body(Body::empty())
            .unwrap();

        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
