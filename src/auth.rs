use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::Settings;
use crate::error::ApiError;

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_ADMIN: &str = "admin";

const REMEMBER_DAYS: i64 = 30;
const DEFAULT_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: i64,
    role: String,
    exp: i64,
}

/// Authenticated identity for the current request, recovered from the
/// bearer token. Passed explicitly into every service call that needs it.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub role: String,
}

impl Session {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role != ROLE_ADMIN {
            return Err(ApiError::forbidden("Administrator access required."));
        }
        Ok(())
    }
}

fn signing_key(settings: &Settings) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(settings.session_secret.as_bytes())
        .map_err(|e| ApiError::Hash(e.to_string()))
}

/// Issues a signed session token. "Remember me" only stretches the expiry;
/// no credential material is ever placed client-side.
pub fn issue_session(
    settings: &Settings,
    user_id: i64,
    role: &str,
    remember: bool,
) -> Result<String, ApiError> {
    let ttl = if remember {
        Duration::days(REMEMBER_DAYS)
    } else {
        Duration::hours(DEFAULT_HOURS)
    };
    let claims = SessionClaims {
        sub: user_id,
        role: role.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    claims
        .sign_with_key(&signing_key(settings)?)
        .map_err(|e| ApiError::Hash(e.to_string()))
}

pub fn verify_session(settings: &Settings, token: &str) -> Result<Session, ApiError> {
    let claims: SessionClaims = token
        .verify_with_key(&signing_key(settings)?)
        .map_err(|_| ApiError::unauthorized("Invalid authorization token."))?;

    if claims.exp < Utc::now().timestamp() {
        return Err(ApiError::unauthorized("Session expired. Please log in again."));
    }

    Ok(Session {
        user_id: claims.sub,
        role: claims.role,
    })
}
