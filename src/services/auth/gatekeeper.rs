//! Per-request authentication pipeline.
//!
//! Stages, in order:
//! 1. route classification (public routes stop here, anonymous)
//! 2. bearer credential extraction from the designated header
//! 3. token validation (signature, then expiry)
//! 4. context construction from the validated claims
//!
//! No credential store lookup happens here: tokens are self-describing, so a token stays
//! usable until it expires even if the principal changes in the meantime.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, Method, Request, header};

use crate::services::auth::context::AuthenticationContext;
use crate::services::auth::error::AuthError;
use crate::services::auth::route_classifier::{AccessPolicy, RouteClassifier};
use crate::services::auth::token_codec::TokenCodec;

const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Clone)]
pub struct AuthenticationGatekeeper {
    classifier: RouteClassifier,
    codec: Arc<TokenCodec>,
    credential_header: HeaderName,
}

impl AuthenticationGatekeeper {
    pub fn new(
        classifier: RouteClassifier,
        codec: Arc<TokenCodec>,
        credential_header: HeaderName,
    ) -> Self {
        Self {
            classifier,
            codec,
            credential_header,
        }
    }

    pub fn credential_header(&self) -> &HeaderName {
        &self.credential_header
    }

    pub fn authenticate<B>(&self, req: &Request<B>) -> Result<AuthenticationContext, AuthError> {
        // Preflights carry no credentials. The router's CorsLayer answers them before this
        // runs; the check keeps the gatekeeper correct when mounted without that layer.
        if is_preflight_request(req.method(), req.headers()) {
            return Ok(AuthenticationContext::Anonymous);
        }

        if self.classifier.classify(req.uri().path(), req.method()) == AccessPolicy::Public {
            return Ok(AuthenticationContext::Anonymous);
        }

        let token = self
            .extract_bearer(req.headers())
            .ok_or(AuthError::MissingCredential)?;

        let claims = self.codec.validate(token)?;

        Ok(AuthenticationContext::Authenticated(claims.into()))
    }

    fn extract_bearer<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get(&self.credential_header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split_once(' '))
            // Auth schemes are case-insensitive (RFC 7235).
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_SCHEME))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
    }
}

/// OPTIONS with `Origin` and `Access-Control-Request-Method`.
fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(header::ORIGIN)
        && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::services::auth::context::AuthenticatedPrincipal;
    use crate::services::auth::credential_store::Principal;
    use crate::services::auth::password::CredentialHash;
    use crate::services::auth::token_codec::ValidationError;

    const SECRET: &[u8] = b"gatekeeper-test-secret-0123456789abcdef";

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::hmac(SECRET, 0).unwrap())
    }

    fn gatekeeper(codec: Arc<TokenCodec>) -> AuthenticationGatekeeper {
        let classifier =
            RouteClassifier::from_specs(["/api/auth/**", "/api/test/**"], AccessPolicy::Public)
                .unwrap();
        AuthenticationGatekeeper::new(classifier, codec, header::AUTHORIZATION)
    }

    fn alice() -> Principal {
        Principal::new(
            "alice",
            ["user".to_string()],
            CredentialHash::from_stored("$2b$04$unused"),
        )
    }

    fn request(method: Method, path: &str, authorization: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn public_route_is_anonymous_without_header() {
        let gk = gatekeeper(codec());

        let ctx = gk
            .authenticate(&request(Method::POST, "/api/auth/login", None))
            .unwrap();

        assert_eq!(ctx, AuthenticationContext::Anonymous);
    }

    #[test]
    fn public_route_ignores_even_a_broken_token() {
        let gk = gatekeeper(codec());

        let ctx = gk
            .authenticate(&request(Method::GET, "/api/test/all", Some("Bearer garbage")))
            .unwrap();

        assert_eq!(ctx, AuthenticationContext::Anonymous);
    }

    #[test]
    fn protected_route_without_header_is_missing_credential() {
        let gk = gatekeeper(codec());

        assert_eq!(
            gk.authenticate(&request(Method::GET, "/api/profile", None)),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn non_bearer_or_empty_credentials_count_as_missing() {
        let gk = gatekeeper(codec());

        for value in ["Basic YWxpY2U6c2VjcmV0", "Bearer", "Bearer    ", "Bearerabc"] {
            assert_eq!(
                gk.authenticate(&request(Method::GET, "/api/profile", Some(value))),
                Err(AuthError::MissingCredential),
                "{value}"
            );
        }
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let codec = codec();
        let issued = codec.issue(&alice(), Duration::minutes(5)).unwrap();
        let gk = gatekeeper(codec);

        for scheme in ["bearer", "BEARER", "BeArEr"] {
            let ctx = gk
                .authenticate(&request(
                    Method::GET,
                    "/api/profile",
                    Some(&format!("{scheme} {}", issued.token)),
                ))
                .unwrap();
            assert!(ctx.principal().is_some(), "{scheme}");
        }
    }

    #[test]
    fn valid_token_yields_authenticated_context() {
        let codec = codec();
        let issued = codec.issue(&alice(), Duration::minutes(5)).unwrap();
        let gk = gatekeeper(codec);

        let ctx = gk
            .authenticate(&request(
                Method::GET,
                "/api/profile",
                Some(&format!("Bearer {}", issued.token)),
            ))
            .unwrap();

        assert_eq!(
            ctx,
            AuthenticationContext::Authenticated(AuthenticatedPrincipal {
                subject: "alice".to_string(),
                roles: vec!["user".to_string()],
                token_id: issued.claims.token_id.clone(),
                expires_at: issued.claims.expires_at,
            })
        );
    }

    #[test]
    fn validation_failures_carry_their_reason() {
        let codec = codec();
        let expired = codec
            .issue_at(&alice(), Duration::seconds(10), Utc::now() - Duration::hours(1))
            .unwrap();
        let gk = gatekeeper(codec);

        assert_eq!(
            gk.authenticate(&request(
                Method::GET,
                "/api/profile",
                Some(&format!("Bearer {}", expired.token)),
            )),
            Err(AuthError::InvalidToken(ValidationError::Expired))
        );
        assert_eq!(
            gk.authenticate(&request(Method::GET, "/api/profile", Some("Bearer not.a.jwt"))),
            Err(AuthError::InvalidToken(ValidationError::Malformed))
        );
    }

    #[test]
    fn traversal_into_a_protected_path_still_requires_auth() {
        let gk = gatekeeper(codec());

        assert_eq!(
            gk.authenticate(&request(Method::GET, "/api/auth/../profile", None)),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn preflight_passes_through_anonymously() {
        let gk = gatekeeper(codec());
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/profile")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(())
            .unwrap();

        assert_eq!(gk.authenticate(&req), Ok(AuthenticationContext::Anonymous));
    }

    #[test]
    fn custom_credential_header() {
        let codec = codec();
        let issued = codec.issue(&alice(), Duration::minutes(5)).unwrap();
        let gk = AuthenticationGatekeeper::new(
            RouteClassifier::default(),
            codec,
            HeaderName::from_static("x-auth-token"),
        );

        let req = Request::builder()
            .uri("/api/profile")
            .header("x-auth-token", format!("Bearer {}", issued.token))
            .body(())
            .unwrap();
        assert!(gk.authenticate(&req).unwrap().principal().is_some());

        // The standard header is not consulted when another one is designated.
        let req = request(
            Method::GET,
            "/api/profile",
            Some(&format!("Bearer {}", issued.token)),
        );
        assert_eq!(gk.authenticate(&req), Err(AuthError::MissingCredential));
    }
}
