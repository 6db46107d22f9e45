use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::Session;
use crate::data::jobs::{Job, NewJob};
use crate::data::users::{NewUser, User, UserSummary};
use crate::enc;
use crate::error::{ApiError, ApiResult};
use crate::services::jobs::{validate_deadline, validate_salary, JobPatch};
use crate::services::{require_non_empty, valid_email};

#[derive(Debug, Deserialize)]
pub struct AdminNewUser {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Empty strings are treated as "not provided", matching the back-office
/// form which posts every input whether or not it was edited.
#[derive(Debug, Default, Deserialize)]
pub struct AdminUserPatch {
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminNewJob {
    pub title: String,
    pub company: String,
    #[serde(rename = "jobType", alias = "type")]
    pub job_type: String,
    pub salary: i64,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub posted_by: Option<i64>,
    pub deadline: String,
}

pub fn list_users(conn: &Connection, session: &Session) -> ApiResult<Vec<UserSummary>> {
    session.require_admin()?;
    Ok(User::list_summaries(conn)?)
}

/// Back-office user creation skips the confirmation dance entirely.
pub fn create_user(conn: &Connection, session: &Session, req: AdminNewUser) -> ApiResult<i64> {
    session.require_admin()?;
    require_non_empty(&req.first_name, "firstName")?;
    require_non_empty(&req.last_name, "lastName")?;
    require_non_empty(&req.email, "email")?;
    require_non_empty(&req.password, "password")?;
    require_non_empty(&req.role, "role")?;
    if !valid_email(&req.email) {
        return Err(ApiError::validation("Invalid email format."));
    }
    if User::email_exists(conn, &req.email)? {
        return Err(ApiError::conflict("Email already exists."));
    }

    let password = enc::hash_password(&req.password)?;
    let id = User::insert(
        conn,
        &NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            gender: String::new(),
            email: req.email,
            phone_number: String::new(),
            nid: String::new(),
            varsity_id: String::new(),
            university: String::new(),
            department: String::new(),
            role: req.role,
            password,
            confirm_token: None,
            varsity_id_picture: String::new(),
            is_confirmed: true,
        },
    )?;
    tracing::info!("admin {} created user {}", session.user_id, id);
    Ok(id)
}

pub fn update_user(
    conn: &Connection,
    session: &Session,
    user_id: i64,
    patch: AdminUserPatch,
) -> ApiResult<()> {
    session.require_admin()?;
    if !User::exists(conn, user_id)? {
        return Err(ApiError::not_found("User not found."));
    }

    let provided = |v: Option<String>| v.filter(|s| !s.is_empty());

    let mut fields: Vec<(&str, Value)> = Vec::new();
    if let Some(first_name) = provided(patch.first_name) {
        fields.push(("first_name", Value::Text(first_name)));
    }
    if let Some(last_name) = provided(patch.last_name) {
        fields.push(("last_name", Value::Text(last_name)));
    }
    if let Some(email) = provided(patch.email) {
        if !valid_email(&email) {
            return Err(ApiError::validation("Invalid email format."));
        }
        if User::email_exists_for_other(conn, &email, user_id)? {
            return Err(ApiError::conflict("Email already exists for another user."));
        }
        fields.push(("email", Value::Text(email)));
    }
    if let Some(password) = provided(patch.password) {
        fields.push(("password", Value::Text(enc::hash_password(&password)?)));
    }
    if let Some(role) = provided(patch.role) {
        fields.push(("role", Value::Text(role)));
    }

    if fields.is_empty() {
        return Err(ApiError::validation("No fields provided to update."));
    }
    User::update_fields(conn, user_id, &fields)?;
    Ok(())
}

/// Deleting a user orphans their postings rather than dropping them, and
/// the two steps commit or roll back together.
pub fn delete_user(conn: &mut Connection, session: &Session, user_id: i64) -> ApiResult<()> {
    session.require_admin()?;
    if !User::exists(conn, user_id)? {
        return Err(ApiError::not_found("User not found."));
    }

    let tx = conn.transaction()?;
    Job::orphan_ownership(&tx, user_id)?;
    if User::delete(&tx, user_id)? == 0 {
        // Dropping the transaction rolls back the ownership update.
        return Err(ApiError::not_found("User not found."));
    }
    tx.commit()?;

    tracing::info!("admin {} deleted user {}", session.user_id, user_id);
    Ok(())
}

pub fn list_jobs(conn: &Connection, session: &Session) -> ApiResult<Vec<Job>> {
    session.require_admin()?;
    Ok(Job::list_with_posters(conn)?)
}

pub fn create_job(conn: &Connection, session: &Session, req: AdminNewJob) -> ApiResult<i64> {
    session.require_admin()?;
    require_non_empty(&req.title, "title")?;
    require_non_empty(&req.company, "company")?;
    require_non_empty(&req.job_type, "jobType")?;
    require_non_empty(&req.location, "location")?;
    require_non_empty(&req.description, "description")?;
    require_non_empty(&req.deadline, "deadline")?;
    validate_salary(req.salary)?;
    validate_deadline(&req.deadline)?;

    let id = Job::insert(
        conn,
        &NewJob {
            title: req.title,
            company: req.company,
            job_type: req.job_type,
            salary: req.salary,
            location: req.location,
            description: req.description,
            requirements: req.requirements,
            posted_by: req.posted_by,
            deadline: req.deadline,
            status: "active".to_string(),
        },
    )?;
    tracing::info!("admin {} created job {}", session.user_id, id);
    Ok(id)
}

pub fn update_job(
    conn: &Connection,
    session: &Session,
    job_id: i64,
    patch: JobPatch,
) -> ApiResult<()> {
    session.require_admin()?;
    super::jobs::update_job(conn, job_id, patch)
}

pub fn delete_job(conn: &Connection, session: &Session, job_id: i64) -> ApiResult<()> {
    session.require_admin()?;
    super::jobs::delete_job(conn, job_id)
}

pub fn user_stats(conn: &Connection, session: &Session) -> ApiResult<serde_json::Value> {
    session.require_admin()?;
    Ok(serde_json::json!({ "total_users": User::count(conn)? }))
}

pub fn job_stats(conn: &Connection, session: &Session) -> ApiResult<serde_json::Value> {
    session.require_admin()?;
    Ok(serde_json::json!({ "total_jobs": Job::count(conn)? }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ROLE_ADMIN, ROLE_STUDENT};
    use crate::db;
    use crate::services::jobs::tests::{insert_user, job_request};
    use crate::services::jobs::{self as job_svc};

    fn admin_session() -> Session {
        Session {
            user_id: 1,
            role: ROLE_ADMIN.into(),
        }
    }

    fn student_session() -> Session {
        Session {
            user_id: 2,
            role: ROLE_STUDENT.into(),
        }
    }

    fn new_user(email: &str) -> AdminNewUser {
        std::env::set_var("HASH_SECRET", "test-secret");
        AdminNewUser {
            first_name: "Nadia".into(),
            last_name: "Islam".into(),
            email: email.into(),
            password: "admin-made-pass".into(),
            role: "faculty".into(),
        }
    }

    #[test]
    fn non_admin_sessions_are_rejected_everywhere() {
        let mut conn = db::open_in_memory();
        let s = student_session();
        assert!(matches!(
            list_users(&conn, &s).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            create_user(&conn, &s, new_user("x@example.com")).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            delete_user(&mut conn, &s, 1).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            job_stats(&conn, &s).unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[test]
    fn created_users_are_preconfirmed() {
        let conn = db::open_in_memory();
        let id = create_user(&conn, &admin_session(), new_user("n@example.com")).unwrap();
        let user = User::find_by_id(&conn, id).unwrap().unwrap();
        assert!(user.is_confirmed);
        assert!(user.confirm_token.is_none());
    }

    #[test]
    fn duplicate_admin_email_conflicts() {
        let conn = db::open_in_memory();
        create_user(&conn, &admin_session(), new_user("n@example.com")).unwrap();
        let err = create_user(&conn, &admin_session(), new_user("n@example.com")).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn patch_skips_empty_strings() {
        let conn = db::open_in_memory();
        let id = create_user(&conn, &admin_session(), new_user("n@example.com")).unwrap();

        update_user(
            &conn,
            &admin_session(),
            id,
            AdminUserPatch {
                first_name: Some("Renamed".into()),
                password: Some(String::new()),
                ..AdminUserPatch::default()
            },
        )
        .unwrap();

        let user = User::find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(user.first_name, "Renamed");
        assert_eq!(user.last_name, "Islam");

        // A patch that only carries empty strings updates nothing.
        let err = update_user(
            &conn,
            &admin_session(),
            id,
            AdminUserPatch {
                email: Some(String::new()),
                ..AdminUserPatch::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn patch_email_collision_conflicts() {
        let conn = db::open_in_memory();
        create_user(&conn, &admin_session(), new_user("a@example.com")).unwrap();
        let b = create_user(&conn, &admin_session(), new_user("b@example.com")).unwrap();

        let err = update_user(
            &conn,
            &admin_session(),
            b,
            AdminUserPatch {
                email: Some("a@example.com".into()),
                ..AdminUserPatch::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn delete_user_orphans_their_jobs() {
        let mut conn = db::open_in_memory();
        let owner = insert_user(&conn, "owner@example.com", "faculty");
        let first = job_svc::post_job(&conn, job_request(owner)).unwrap();
        let second = job_svc::post_job(&conn, job_request(owner)).unwrap();

        delete_user(&mut conn, &admin_session(), owner).unwrap();

        assert!(!User::exists(&conn, owner).unwrap());
        for id in [first, second] {
            let job = Job::find_by_id(&conn, id).unwrap().unwrap();
            assert_eq!(job.posted_by, None);
        }
    }

    #[test]
    fn delete_user_rolls_back_on_failure() {
        let mut conn = db::open_in_memory();
        let owner = insert_user(&conn, "owner@example.com", "faculty");
        let job = job_svc::post_job(&conn, job_request(owner)).unwrap();

        // Force the second statement of the transaction to fail.
        conn.execute_batch(
            "CREATE TRIGGER block_user_delete BEFORE DELETE ON users
             BEGIN SELECT RAISE(ABORT, 'delete blocked'); END;",
        )
        .unwrap();

        let err = delete_user(&mut conn, &admin_session(), owner).unwrap_err();
        assert!(matches!(err, ApiError::Database(_)));

        // All-or-nothing: the ownership update must not have survived.
        assert!(User::exists(&conn, owner).unwrap());
        let job = Job::find_by_id(&conn, job).unwrap().unwrap();
        assert_eq!(job.posted_by, Some(owner));
    }

    #[test]
    fn delete_missing_user_is_not_found() {
        let mut conn = db::open_in_memory();
        let err = delete_user(&mut conn, &admin_session(), 404).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn admin_job_listing_joins_poster_names() {
        let conn = db::open_in_memory();
        let owner = insert_user(&conn, "owner@example.com", "faculty");
        job_svc::post_job(&conn, job_request(owner)).unwrap();

        let jobs = list_jobs(&conn, &admin_session()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].posted_by_name.as_deref(), Some("Test User"));
    }

    #[test]
    fn admin_job_validation_matches_posting_rules() {
        let conn = db::open_in_memory();
        let req = AdminNewJob {
            title: "Lecturer".into(),
            company: "Example University".into(),
            job_type: "part-time".into(),
            salary: -1,
            location: "Dhaka".into(),
            description: "Teach.".into(),
            requirements: String::new(),
            posted_by: None,
            deadline: crate::services::jobs::tests::future_date(),
        };
        let err = create_job(&conn, &admin_session(), req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(Job::count(&conn).unwrap(), 0);
    }

    #[test]
    fn stats_count_rows() {
        let conn = db::open_in_memory();
        create_user(&conn, &admin_session(), new_user("a@example.com")).unwrap();
        create_user(&conn, &admin_session(), new_user("b@example.com")).unwrap();
        let owner = insert_user(&conn, "owner@example.com", "faculty");
        job_svc::post_job(&conn, job_request(owner)).unwrap();

        let users = user_stats(&conn, &admin_session()).unwrap();
        assert_eq!(users["total_users"], 3);
        let jobs = job_stats(&conn, &admin_session()).unwrap();
        assert_eq!(jobs["total_jobs"], 1);
    }
}
