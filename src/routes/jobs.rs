use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::db;
use crate::error::ApiError;
use crate::routes::parse_action;
use crate::services::jobs::{self, JobPatch, NewJobRequest};
use crate::state::AppState;

const ACTIONS: &[&str] = &["postJob", "updateJob", "deleteJob", "apply"];

#[derive(Deserialize)]
pub struct JobsQuery {
    action: String,
    #[serde(rename = "userId")]
    user_id: Option<i64>,
    #[serde(rename = "jobId")]
    job_id: Option<i64>,
}

/// The defined read operations; anything else in the query string is an
/// unknown action.
enum JobListing {
    All,
    ByUser(i64),
    Applications(i64),
}

impl TryFrom<JobsQuery> for JobListing {
    type Error = ApiError;

    fn try_from(query_params: JobsQuery) -> Result<JobListing, ApiError> {
        match query_params.action.as_str() {
            "getJobs" => Ok(JobListing::All),
            "getMyJobs" => query_params
                .user_id
                .map(JobListing::ByUser)
                .ok_or_else(|| ApiError::validation("Valid User ID is required.")),
            "getJobApplications" => query_params
                .job_id
                .map(JobListing::Applications)
                .ok_or_else(|| ApiError::validation("Valid Job ID is required.")),
            other => Err(ApiError::not_found(format!("Action '{other}' not found."))),
        }
    }
}

#[get("/api/v1/jobs")]
pub async fn query(
    state: web::Data<AppState>,
    query: web::Query<JobsQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = db::open(&state.settings.database_path)?;

    match JobListing::try_from(query.into_inner())? {
        JobListing::All => {
            let jobs = jobs::list_jobs(&conn)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "jobs": jobs })))
        }
        JobListing::ByUser(user_id) => {
            let jobs = jobs::jobs_by_user(&conn, user_id)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "jobs": jobs })))
        }
        JobListing::Applications(job_id) => {
            let applications = jobs::job_applications(&conn, job_id)?;
            Ok(HttpResponse::Ok().json(
                serde_json::json!({ "success": true, "applications": applications }),
            ))
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "action")]
enum JobAction {
    #[serde(rename = "postJob")]
    PostJob(NewJobRequest),
    #[serde(rename = "updateJob")]
    UpdateJob {
        #[serde(rename = "jobId")]
        job_id: i64,
        #[serde(flatten)]
        patch: JobPatch,
    },
    #[serde(rename = "deleteJob")]
    DeleteJob {
        #[serde(rename = "jobId")]
        job_id: i64,
    },
    #[serde(rename = "apply")]
    Apply {
        #[serde(rename = "jobId")]
        job_id: i64,
        #[serde(rename = "userId")]
        user_id: i64,
        #[serde(rename = "coverLetter", default)]
        cover_letter: String,
    },
}

#[post("/api/v1/jobs")]
pub async fn dispatch(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, ApiError> {
    let action: JobAction = parse_action(body.into_inner(), ACTIONS)?;
    let conn = db::open(&state.settings.database_path)?;

    match action {
        JobAction::PostJob(req) => {
            jobs::post_job(&conn, req)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Job posted successfully."
            })))
        }
        JobAction::UpdateJob { job_id, patch } => {
            jobs::update_job(&conn, job_id, patch)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Job updated successfully."
            })))
        }
        JobAction::DeleteJob { job_id } => {
            jobs::delete_job(&conn, job_id)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Job deleted successfully."
            })))
        }
        JobAction::Apply {
            job_id,
            user_id,
            cover_letter,
        } => {
            jobs::apply_to_job(&conn, job_id, user_id, &cover_letter)?;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Application submitted successfully!"
            })))
        }
    }
}
