use chrono::{Duration, NaiveDateTime, Utc};
use rand::RngCore;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::config::Settings;
use crate::data::resets::ResetToken;
use crate::data::users::{NewUser, PublicUser, UniqueField, User};
use crate::enc;
use crate::error::{ApiError, ApiResult};
use crate::mailer::Mailer;
use crate::services::{require_non_empty, valid_email, SQL_DATETIME};

const RESET_TOKEN_TTL_HOURS: i64 = 1;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub gender: String,
    pub email: String,
    #[serde(alias = "phone")]
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub nid: String,
    #[serde(default)]
    pub varsity_id: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub department: String,
    pub role: String,
    pub password: String,
    #[serde(default)]
    pub varsity_id_picture: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub token: String,
}

/// Creates an unconfirmed account and mails the confirmation link. The row
/// is committed before the mail goes out: delivery failure surfaces as an
/// error but never rolls the account back.
pub fn register(
    conn: &Connection,
    mailer: &dyn Mailer,
    settings: &Settings,
    req: RegisterRequest,
) -> ApiResult<()> {
    require_non_empty(&req.first_name, "first_name")?;
    require_non_empty(&req.last_name, "last_name")?;
    require_non_empty(&req.email, "email")?;
    require_non_empty(&req.role, "role")?;
    require_non_empty(&req.password, "password")?;
    if !valid_email(&req.email) {
        return Err(ApiError::validation("Invalid email format."));
    }
    if User::email_exists(conn, &req.email)? {
        return Err(ApiError::conflict("Email already registered."));
    }

    let password = enc::hash_password(&req.password)?;
    let token = Uuid::new_v4().simple().to_string();

    User::insert(
        conn,
        &NewUser {
            first_name: req.first_name.clone(),
            last_name: req.last_name,
            gender: req.gender,
            email: req.email.clone(),
            phone_number: req.phone_number,
            nid: req.nid,
            varsity_id: req.varsity_id,
            university: req.university,
            department: req.department,
            role: req.role,
            password,
            confirm_token: Some(token.clone()),
            varsity_id_picture: req.varsity_id_picture,
            is_confirmed: false,
        },
    )?;

    let link = format!(
        "{}/confirm?token={}&email={}",
        settings.base_url, token, req.email
    );
    let body = format!(
        "Hi {},\n\nPlease click the link below to confirm your account:\n{}\n\nThanks!",
        req.first_name, link
    );
    mailer.send(&req.email, "Confirm your account", &body)?;

    tracing::info!("registered unconfirmed account for {}", req.email);
    Ok(())
}

/// Confirmation is a single conditional UPDATE. Zero rows changed covers
/// both a bad token and an already-confirmed account; callers get the same
/// answer for either.
pub fn confirm(conn: &Connection, email: &str, token: &str) -> ApiResult<()> {
    if User::confirm(conn, email, token)? == 0 {
        return Err(ApiError::not_found("Invalid or expired confirmation link."));
    }
    tracing::info!("account confirmed for {}", email);
    Ok(())
}

pub fn login(conn: &Connection, settings: &Settings, req: LoginRequest) -> ApiResult<LoginOutcome> {
    let user = User::find_by_email(conn, &req.email)?
        .ok_or_else(|| ApiError::not_found("No account found with this email."))?;

    if !user.is_confirmed {
        return Err(ApiError::unauthorized(
            "Please confirm your email before logging in.",
        ));
    }
    if !enc::verify_password(&req.password, &user.password)? {
        tracing::warn!("failed login attempt for {}", req.email);
        return Err(ApiError::unauthorized("Invalid email or password."));
    }

    let token = auth::issue_session(settings, user.id, &user.role, req.remember)?;
    Ok(LoginOutcome {
        user: user.public(),
        token,
    })
}

/// Issues a reset token for a confirmed account: 32 random bytes, mailed
/// raw, stored only as a SHA-256 hash with a one-hour expiry.
pub fn forgot_password(
    conn: &Connection,
    mailer: &dyn Mailer,
    settings: &Settings,
    email: &str,
) -> ApiResult<()> {
    require_non_empty(email, "email")?;
    let user = User::find_by_email(conn, email)?
        .filter(|u| u.is_confirmed)
        .ok_or_else(|| ApiError::not_found("No account found with this email address."))?;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

    let expires_at = (Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS))
        .format(SQL_DATETIME)
        .to_string();
    ResetToken::insert(conn, user.id, &ResetToken::hash(&token), &expires_at)?;

    let link = format!("{}/reset_password?token={}", settings.base_url, token);
    let body = format!(
        "Hi {},\n\nSomeone requested a password reset for your account. If this was you, \
         please click the link below to set a new password:\n{}\n\nThis link will expire \
         in 1 hour. If you did not request this, you can safely ignore this email.\n\nThanks!",
        user.first_name, link
    );
    mailer.send(email, "Password Reset Request", &body)?;

    tracing::info!("password reset requested for {}", email);
    Ok(())
}

/// Resolves a raw token to its owning user. Expired tokens are deleted on
/// sight so they cannot be probed again.
pub fn validate_reset_token(conn: &Connection, raw_token: &str) -> ApiResult<i64> {
    let hash = ResetToken::hash(raw_token);
    let stored = ResetToken::find_by_hash(conn, &hash)?
        .ok_or_else(|| ApiError::not_found("Invalid or expired password reset link."))?;

    let expired = NaiveDateTime::parse_from_str(&stored.expires_at, SQL_DATETIME)
        .map(|exp| exp < Utc::now().naive_utc())
        .unwrap_or(true);
    if expired {
        ResetToken::delete_by_hash(conn, &hash)?;
        return Err(ApiError::not_found(
            "Password reset link has expired. Please request a new one.",
        ));
    }
    Ok(stored.user_id)
}

pub fn reset_password(conn: &Connection, raw_token: &str, new_password: &str) -> ApiResult<()> {
    if raw_token.is_empty() || new_password.is_empty() {
        return Err(ApiError::validation("Token and new password are required."));
    }
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Password must be at least 8 characters long.",
        ));
    }

    let user_id = validate_reset_token(conn, raw_token)?;
    let hash = enc::hash_password(new_password)?;
    User::update_password(conn, user_id, &hash)?;
    // Single use: the token dies with the password change.
    ResetToken::delete_by_hash(conn, &ResetToken::hash(raw_token))?;

    tracing::info!("password reset completed for user {}", user_id);
    Ok(())
}

pub fn check_unique(conn: &Connection, field: UniqueField, value: &str) -> ApiResult<bool> {
    if value.trim().is_empty() {
        return Err(ApiError::validation("Field name and value are required."));
    }
    Ok(!User::field_exists(conn, field, value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::mailer::mock::RecordingMailer;

    fn setup() -> (Connection, Settings) {
        std::env::set_var("HASH_SECRET", "test-secret");
        (db::open_in_memory(), Settings::for_tests())
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            first_name: "Alice".into(),
            last_name: "Rahman".into(),
            gender: "female".into(),
            email: "alice@example.com".into(),
            phone_number: "01700000001".into(),
            nid: "1234567890".into(),
            varsity_id: "CSE-001".into(),
            university: "Example University".into(),
            department: "CSE".into(),
            role: "student".into(),
            password: "correct horse".into(),
            varsity_id_picture: String::new(),
        }
    }

    fn stored_confirm_token(conn: &Connection, email: &str) -> String {
        User::find_by_email(conn, email)
            .unwrap()
            .unwrap()
            .confirm_token
            .unwrap()
    }

    #[test]
    fn register_then_confirm_then_login() {
        let (conn, settings) = setup();
        let mailer = RecordingMailer::default();

        register(&conn, &mailer, &settings, alice()).unwrap();
        assert_eq!(mailer.sent_to(), vec!["alice@example.com".to_string()]);

        // Unconfirmed accounts cannot log in yet.
        let err = login(
            &conn,
            &settings,
            LoginRequest {
                email: "alice@example.com".into(),
                password: "correct horse".into(),
                remember: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let token = stored_confirm_token(&conn, "alice@example.com");
        confirm(&conn, "alice@example.com", &token).unwrap();

        let outcome = login(
            &conn,
            &settings,
            LoginRequest {
                email: "alice@example.com".into(),
                password: "correct horse".into(),
                remember: false,
            },
        )
        .unwrap();
        assert_eq!(outcome.user.email, "alice@example.com");
        assert!(!outcome.token.is_empty());

        let err = login(
            &conn,
            &settings,
            LoginRequest {
                email: "alice@example.com".into(),
                password: "wrong horse".into(),
                remember: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let (conn, settings) = setup();
        let mailer = RecordingMailer::default();

        register(&conn, &mailer, &settings, alice()).unwrap();
        let err = register(&conn, &mailer, &settings, alice()).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn register_keeps_row_when_mail_fails() {
        let (conn, settings) = setup();
        let mailer = RecordingMailer::failing();

        let err = register(&conn, &mailer, &settings, alice()).unwrap_err();
        assert!(matches!(err, ApiError::Delivery(_)));
        assert!(User::email_exists(&conn, "alice@example.com").unwrap());
    }

    #[test]
    fn mismatched_confirmation_never_confirms() {
        let (conn, settings) = setup();
        let mailer = RecordingMailer::default();
        register(&conn, &mailer, &settings, alice()).unwrap();

        let err = confirm(&conn, "alice@example.com", "not-the-token").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        let user = User::find_by_email(&conn, "alice@example.com").unwrap().unwrap();
        assert!(!user.is_confirmed);

        // Wrong email with the right token is just as dead.
        let token = stored_confirm_token(&conn, "alice@example.com");
        assert!(confirm(&conn, "bob@example.com", &token).is_err());
    }

    #[test]
    fn confirming_twice_reports_failure() {
        let (conn, settings) = setup();
        let mailer = RecordingMailer::default();
        register(&conn, &mailer, &settings, alice()).unwrap();

        let token = stored_confirm_token(&conn, "alice@example.com");
        confirm(&conn, "alice@example.com", &token).unwrap();
        assert!(confirm(&conn, "alice@example.com", &token).is_err());
    }

    fn confirmed_alice(conn: &Connection, settings: &Settings) {
        let mailer = RecordingMailer::default();
        register(conn, &mailer, settings, alice()).unwrap();
        let token = stored_confirm_token(conn, "alice@example.com");
        confirm(conn, "alice@example.com", &token).unwrap();
    }

    fn token_from_mail(mailer: &RecordingMailer) -> String {
        let body = mailer.last_body().unwrap();
        let marker = "token=";
        let start = body.find(marker).unwrap() + marker.len();
        body[start..start + 64].to_string()
    }

    #[test]
    fn reset_flow_happy_path() {
        let (conn, settings) = setup();
        confirmed_alice(&conn, &settings);

        let mailer = RecordingMailer::default();
        forgot_password(&conn, &mailer, &settings, "alice@example.com").unwrap();
        let raw = token_from_mail(&mailer);

        reset_password(&conn, &raw, "a new password").unwrap();
        let outcome = login(
            &conn,
            &settings,
            LoginRequest {
                email: "alice@example.com".into(),
                password: "a new password".into(),
                remember: false,
            },
        )
        .unwrap();
        assert_eq!(outcome.user.first_name, "Alice");

        // Single use: the same token is gone.
        let err = reset_password(&conn, &raw, "another password").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn forgot_password_for_unknown_email() {
        let (conn, settings) = setup();
        let mailer = RecordingMailer::default();
        let err = forgot_password(&conn, &mailer, &settings, "ghost@example.com").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(mailer.sent_to().is_empty());
    }

    #[test]
    fn expired_token_fails_and_is_deleted() {
        let (conn, settings) = setup();
        confirmed_alice(&conn, &settings);
        let user = User::find_by_email(&conn, "alice@example.com").unwrap().unwrap();

        let raw = "deadbeef".repeat(8);
        let expired_at = (Utc::now() - Duration::seconds(1))
            .format(SQL_DATETIME)
            .to_string();
        ResetToken::insert(&conn, user.id, &ResetToken::hash(&raw), &expired_at).unwrap();

        let err = reset_password(&conn, &raw, "a new password").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(ResetToken::find_by_hash(&conn, &ResetToken::hash(&raw))
            .unwrap()
            .is_none());
    }

    #[test]
    fn short_password_rejected_before_token_lookup() {
        let (conn, _settings) = setup();
        let err = reset_password(&conn, "whatever", "short").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn check_unique_reflects_rows() {
        let (conn, settings) = setup();
        let mailer = RecordingMailer::default();
        register(&conn, &mailer, &settings, alice()).unwrap();

        assert!(!check_unique(&conn, UniqueField::Email, "alice@example.com").unwrap());
        assert!(check_unique(&conn, UniqueField::Email, "bob@example.com").unwrap());
        assert!(!check_unique(&conn, UniqueField::Nid, "1234567890").unwrap());
        assert!(check_unique(&conn, UniqueField::VarsityId, "CSE-999").unwrap());
    }
}
