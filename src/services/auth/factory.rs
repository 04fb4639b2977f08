/// Factory: build the authentication components from application `Config`.
///
/// Everything built here is immutable after start-up and shared through `Arc`.
/// Any error is a start-up failure (bad key material, invalid route rules, invalid cost).
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, JwtKeyConfig};
use crate::services::auth::route_classifier::RouteRule;
use crate::services::auth::{
    AccessPolicy, AuthenticationGatekeeper, CredentialStore, LoginService, PasswordVerifier,
    RouteClassifier, TokenCodec,
};

pub struct AuthComponents {
    pub gatekeeper: Arc<AuthenticationGatekeeper>,
    pub login: Arc<LoginService>,
}

pub fn build_auth_components(
    config: &Config,
    store: Arc<dyn CredentialStore>,
) -> Result<AuthComponents> {
    let codec = Arc::new(build_token_codec(config)?);

    let classifier = RouteClassifier::from_specs(&config.public_routes, AccessPolicy::Public)
        .context("invalid AUTH_PUBLIC_ROUTES")?;

    let public_routes: Vec<&str> = classifier.rules().iter().map(RouteRule::pattern).collect();
    tracing::info!(
        ?public_routes,
        "route policy loaded (unmatched routes require authentication)"
    );

    let gatekeeper = AuthenticationGatekeeper::new(classifier, codec.clone(), config.auth_header.clone());

    let passwords = PasswordVerifier::new(config.password_hash_cost)
        .context("invalid PASSWORD_HASH_COST")?;

    tracing::info!(
        header = %gatekeeper.credential_header(),
        bcrypt_cost = passwords.cost(),
        store_timeout_ms = config.credential_store_timeout.as_millis() as u64,
        "authentication configured"
    );

    let login = LoginService::new(
        store,
        Arc::new(passwords),
        codec,
        token_ttl(config.access_token_ttl_seconds)?,
        config.credential_store_timeout,
    )
    .map_err(|e| anyhow::anyhow!("failed to build login service: {e}"))?;

    Ok(AuthComponents {
        gatekeeper: Arc::new(gatekeeper),
        login: Arc::new(login),
    })
}

fn build_token_codec(config: &Config) -> Result<TokenCodec> {
    let leeway = config.access_token_leeway_seconds;

    let codec = match &config.jwt_key {
        JwtKeyConfig::Secret(secret) => TokenCodec::hmac(secret.as_bytes(), leeway),
        JwtKeyConfig::Ed25519 {
            private_key_pem,
            public_key_pem,
        } => TokenCodec::ed25519(private_key_pem.as_deref(), public_key_pem, leeway),
    }
    .context("failed to load token signing key")?;

    if !codec.can_issue() {
        tracing::warn!("no private key configured: tokens can be validated but not issued");
    }

    Ok(codec)
}

fn token_ttl(seconds: u64) -> Result<chrono::Duration> {
    i64::try_from(seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .with_context(|| format!("ACCESS_TOKEN_TTL_SECONDS out of range: {seconds}"))
}
