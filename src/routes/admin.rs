use actix_web::{get, post, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::Deserialize;

use crate::auth;
use crate::db;
use crate::error::ApiError;
use crate::routes::parse_action;
use crate::services::admin::{self, AdminNewJob, AdminNewUser, AdminUserPatch};
use crate::services::jobs::JobPatch;
use crate::state::AppState;

const ACTIONS: &[&str] = &[
    "createUser",
    "updateUser",
    "deleteUser",
    "createJob",
    "updateJob",
    "deleteJob",
];

#[derive(Deserialize)]
pub struct AdminQuery {
    action: String,
}

#[get("/api/v1/admin")]
pub async fn query(
    state: web::Data<AppState>,
    auth_header: BearerAuth,
    query: web::Query<AdminQuery>,
) -> Result<HttpResponse, ApiError> {
    let session = auth::verify_session(&state.settings, auth_header.token())?;
    let conn = db::open(&state.settings.database_path)?;

    match query.action.as_str() {
        "getAllUsers" => {
            let users = admin::list_users(&conn, &session)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "users": users })))
        }
        "getAllJobs" => {
            let jobs = admin::list_jobs(&conn, &session)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "jobs": jobs })))
        }
        "getUserStats" => {
            let stats = admin::user_stats(&conn, &session)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "stats": stats })))
        }
        "getJobStats" => {
            let stats = admin::job_stats(&conn, &session)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "stats": stats })))
        }
        other => Err(ApiError::not_found(format!("Action '{other}' not found."))),
    }
}

#[derive(Deserialize)]
#[serde(tag = "action")]
enum AdminAction {
    #[serde(rename = "createUser")]
    CreateUser(AdminNewUser),
    #[serde(rename = "updateUser")]
    UpdateUser {
        #[serde(alias = "userId")]
        id: i64,
        #[serde(flatten)]
        patch: AdminUserPatch,
    },
    #[serde(rename = "deleteUser")]
    DeleteUser {
        #[serde(alias = "userId")]
        id: i64,
    },
    #[serde(rename = "createJob")]
    CreateJob(AdminNewJob),
    #[serde(rename = "updateJob")]
    UpdateJob {
        #[serde(alias = "jobId")]
        id: i64,
        #[serde(flatten)]
        patch: JobPatch,
    },
    #[serde(rename = "deleteJob")]
    DeleteJob {
        #[serde(alias = "jobId")]
        id: i64,
    },
}

#[post("/api/v1/admin")]
pub async fn dispatch(
    state: web::Data<AppState>,
    auth_header: BearerAuth,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, ApiError> {
    let session = auth::verify_session(&state.settings, auth_header.token())?;
    let action: AdminAction = parse_action(body.into_inner(), ACTIONS)?;
    let mut conn = db::open(&state.settings.database_path)?;

    match action {
        AdminAction::CreateUser(req) => {
            let id = admin::create_user(&conn, &session, req)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": format!("User created successfully with ID: {id}")
            })))
        }
        AdminAction::UpdateUser { id, patch } => {
            admin::update_user(&conn, &session, id, patch)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "User updated successfully."
            })))
        }
        AdminAction::DeleteUser { id } => {
            admin::delete_user(&mut conn, &session, id)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "User and their jobs deleted successfully."
            })))
        }
        AdminAction::CreateJob(req) => {
            let id = admin::create_job(&conn, &session, req)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": format!("Job created successfully with ID: {id}")
            })))
        }
        AdminAction::UpdateJob { id, patch } => {
            admin::update_job(&conn, &session, id, patch)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Job updated successfully."
            })))
        }
        AdminAction::DeleteJob { id } => {
            admin::delete_job(&conn, &session, id)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Job deleted successfully."
            })))
        }
    }
}
