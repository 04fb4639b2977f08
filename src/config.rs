/*
 * Responsibility
 * - Read settings from the environment (.env supported via dotenvy)
 * - Validate them once at start-up (missing or invalid values abort the process)
 * - Config is immutable afterwards
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;

pub const DEFAULT_PUBLIC_ROUTES: &str = "/api/auth/**,/api/test/**";

/// Upper bound for `ACCESS_TOKEN_TTL_SECONDS` (10 years).
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Token signing material. Exactly one form is configured.
#[derive(Clone)]
pub enum JwtKeyConfig {
    /// HS256 shared secret (`AUTH_JWT_SECRET`).
    Secret(String),
    /// EdDSA key pair (`AUTH_JWT_PRIVATE_KEY_PEM` optional, `AUTH_JWT_PUBLIC_KEY_PEM`).
    Ed25519 {
        private_key_pem: Option<String>,
        public_key_pem: String,
    },
}

impl fmt::Debug for JwtKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        match self {
            JwtKeyConfig::Secret(_) => f.write_str("Secret(<redacted>)"),
            JwtKeyConfig::Ed25519 {
                private_key_pem, ..
            } => f
                .debug_struct("Ed25519")
                .field("has_private_key", &private_key_pem.is_some())
                .finish(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub jwt_key: JwtKeyConfig,
    pub access_token_ttl_seconds: u64,
    pub access_token_leeway_seconds: u64,

    // Header carrying `Bearer <token>`
    pub auth_header: HeaderName,
    // Ordered public route rules; anything else requires authentication
    pub public_routes: Vec<String>,

    pub password_hash_cost: u32,
    pub credential_store_timeout: Duration,

    pub http_request_timeout: Duration,
    pub http_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 8080)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let cors_allowed_origins = split_list(&lookup("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let jwt_key = read_jwt_key(&lookup)?;

        let access_token_ttl_seconds = parse_or(&lookup, "ACCESS_TOKEN_TTL_SECONDS", 86_400)?; // 24h
        if access_token_ttl_seconds == 0 || access_token_ttl_seconds > MAX_ACCESS_TOKEN_TTL_SECONDS {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_TTL_SECONDS"));
        }
        let access_token_leeway_seconds = parse_or(&lookup, "ACCESS_TOKEN_LEEWAY_SECONDS", 0)?;

        let auth_header = match lookup("AUTH_HEADER") {
            Some(name) => HeaderName::from_str(name.trim())
                .map_err(|_| ConfigError::Invalid("AUTH_HEADER"))?,
            None => axum::http::header::AUTHORIZATION,
        };

        let public_routes = split_list(
            &lookup("AUTH_PUBLIC_ROUTES").unwrap_or_else(|| DEFAULT_PUBLIC_ROUTES.to_string()),
        );

        let password_hash_cost = parse_or(&lookup, "PASSWORD_HASH_COST", 10)?;

        let credential_store_timeout =
            Duration::from_millis(parse_or(&lookup, "CREDENTIAL_STORE_TIMEOUT_MS", 2_000)?);

        let http_request_timeout =
            Duration::from_secs(parse_or(&lookup, "HTTP_REQUEST_TIMEOUT_SECONDS", 30)?);
        let http_body_limit_bytes = parse_or(&lookup, "HTTP_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            jwt_key,
            access_token_ttl_seconds,
            access_token_leeway_seconds,
            auth_header,
            public_routes,
            password_hash_cost,
            credential_store_timeout,
            http_request_timeout,
            http_body_limit_bytes,
        })
    }
}

fn read_jwt_key<F>(lookup: &F) -> Result<JwtKeyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // PEM values are often passed on one line with literal "\n".
    let pem = |key: &str| lookup(key).map(|v| v.replace("\\n", "\n"));

    let secret = lookup("AUTH_JWT_SECRET").filter(|s| !s.is_empty());
    let private_key_pem = pem("AUTH_JWT_PRIVATE_KEY_PEM");
    let public_key_pem = pem("AUTH_JWT_PUBLIC_KEY_PEM");

    match (secret, public_key_pem) {
        (Some(_), Some(_)) => Err(ConfigError::Invalid("AUTH_JWT_SECRET")),
        (Some(secret), None) => Ok(JwtKeyConfig::Secret(secret)),
        (None, Some(public_key_pem)) => Ok(JwtKeyConfig::Ed25519 {
            private_key_pem,
            public_key_pem,
        }),
        (None, None) => Err(ConfigError::Missing("AUTH_JWT_SECRET")),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        _ => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
