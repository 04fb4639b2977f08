/*
 * Responsibility
 * - Sign-in / sign-up request and response DTOs
 * - validate(): shape checks only (credentials are checked by LoginService)
 */
use serde::{Deserialize, Serialize};

use crate::services::auth::token_codec::IssuedToken;

const USERNAME_MIN_CHARS: usize = 3;
const USERNAME_MAX_CHARS: usize = 20;
const PASSWORD_MIN_CHARS: usize = 6;
// bcrypt only reads the first 72 bytes.
const PASSWORD_MAX_BYTES: usize = 72;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

impl SignInRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.trim().is_empty() {
            return Err("username is required");
        }
        if self.password.is_empty() {
            return Err("password is required");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        let name_len = self.username.chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&name_len) {
            return Err("username must be 3 to 20 characters");
        }
        if self.username.trim() != self.username {
            return Err("username must not start or end with whitespace");
        }
        if self.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err("password must be at least 6 characters");
        }
        if self.password.len() > PASSWORD_MAX_BYTES {
            return Err("password must be at most 72 bytes");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<IssuedToken> for SignInResponse {
    fn from(issued: IssuedToken) -> Self {
        let expires_in = issued.expires_in();
        Self {
            access_token: issued.token,
            token_type: "Bearer",
            expires_in,
            username: issued.claims.subject,
            roles: issued.claims.roles,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
