use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::data::users::UniqueField;
use crate::db;
use crate::error::ApiError;
use crate::routes::parse_action;
use crate::services::account::{self, LoginRequest, RegisterRequest};
use crate::state::AppState;

const ACTIONS: &[&str] = &[
    "register",
    "login",
    "checkUnique",
    "forgotPassword",
    "change_password",
];

#[derive(Deserialize)]
#[serde(tag = "action")]
enum UserAction {
    #[serde(rename = "register")]
    Register(RegisterRequest),
    #[serde(rename = "login")]
    Login(LoginRequest),
    #[serde(rename = "checkUnique")]
    CheckUnique { field: UniqueField, value: String },
    #[serde(rename = "forgotPassword")]
    ForgotPassword { email: String },
    #[serde(rename = "change_password")]
    ChangePassword {
        token: String,
        #[serde(rename = "newPassword")]
        new_password: String,
    },
}

#[post("/api/v1/user")]
pub async fn dispatch(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, ApiError> {
    let action: UserAction = parse_action(body.into_inner(), ACTIONS)?;
    let conn = db::open(&state.settings.database_path)?;

    match action {
        UserAction::Register(req) => {
            account::register(&conn, state.mailer.as_ref(), &state.settings, req)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Account created! Please check your email to confirm."
            })))
        }
        UserAction::Login(req) => {
            let outcome = account::login(&conn, &state.settings, req)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Login successful!",
                "user": outcome.user,
                "token": outcome.token
            })))
        }
        UserAction::CheckUnique { field, value } => {
            let is_unique = account::check_unique(&conn, field, &value)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "isUnique": is_unique
            })))
        }
        UserAction::ForgotPassword { email } => {
            account::forgot_password(&conn, state.mailer.as_ref(), &state.settings, &email)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "If an account with that email exists, a password reset link has been sent."
            })))
        }
        UserAction::ChangePassword {
            token,
            new_password,
        } => {
            account::reset_password(&conn, &token, &new_password)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Your password has been updated successfully."
            })))
        }
    }
}

#[derive(Deserialize)]
pub struct ConfirmQuery {
    token: String,
    email: String,
}

/// Landing endpoint for the link mailed at registration.
#[get("/confirm")]
pub async fn confirm_account(
    state: web::Data<AppState>,
    query: web::Query<ConfirmQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::open(&state.settings.database_path)?;
    account::confirm(&conn, &query.email, &query.token)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Your account has been confirmed! You can now login."
    })))
}

#[derive(Deserialize)]
pub struct ResetQuery {
    token: String,
}

/// Pre-flight check for the reset link: resolves the token before the
/// client shows its change-password form.
#[get("/reset_password")]
pub async fn validate_reset(
    state: web::Data<AppState>,
    query: web::Query<ResetQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::open(&state.settings.database_path)?;
    let user_id = account::validate_reset_token(&conn, &query.token)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user_id": user_id
    })))
}
