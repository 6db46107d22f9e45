use chrono::{NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::ROLE_STUDENT;
use crate::data::jobs::{Job, JobApplication, NewJob};
use crate::data::users::User;
use crate::error::{ApiError, ApiResult};
use crate::services::require_non_empty;

#[derive(Debug, Deserialize)]
pub struct NewJobRequest {
    pub title: String,
    pub company: String,
    #[serde(rename = "type", alias = "jobType")]
    pub job_type: String,
    pub salary: i64,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    pub posted_by: i64,
    pub deadline: String,
}

/// Override-or-keep patch: a present field replaces the stored value, an
/// absent one leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct JobPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    #[serde(rename = "type", alias = "jobType")]
    pub job_type: Option<String>,
    pub salary: Option<i64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub deadline: Option<String>,
}

pub(crate) fn validate_salary(salary: i64) -> ApiResult<()> {
    if salary < 0 {
        return Err(ApiError::validation("Salary must be a non-negative number."));
    }
    Ok(())
}

pub(crate) fn validate_deadline(deadline: &str) -> ApiResult<()> {
    let date = NaiveDate::parse_from_str(deadline, "%Y-%m-%d")
        .map_err(|_| ApiError::validation("Invalid deadline format. Use YYYY-MM-DD."))?;
    if date <= Utc::now().date_naive() {
        return Err(ApiError::validation("Deadline must be in the future."));
    }
    Ok(())
}

impl JobPatch {
    /// Validates whatever is present and lowers it to (column, value)
    /// pairs for the dynamic UPDATE.
    pub(crate) fn into_fields(self) -> ApiResult<Vec<(&'static str, Value)>> {
        let mut fields: Vec<(&'static str, Value)> = Vec::new();
        if let Some(title) = self.title {
            fields.push(("title", Value::Text(title)));
        }
        if let Some(company) = self.company {
            fields.push(("company", Value::Text(company)));
        }
        if let Some(job_type) = self.job_type {
            fields.push(("type", Value::Text(job_type)));
        }
        if let Some(salary) = self.salary {
            validate_salary(salary)?;
            fields.push(("salary", Value::Integer(salary)));
        }
        if let Some(location) = self.location {
            fields.push(("location", Value::Text(location)));
        }
        if let Some(description) = self.description {
            fields.push(("description", Value::Text(description)));
        }
        if let Some(requirements) = self.requirements {
            fields.push(("requirements", Value::Text(requirements)));
        }
        if let Some(deadline) = self.deadline {
            validate_deadline(&deadline)?;
            fields.push(("deadline", Value::Text(deadline)));
        }
        Ok(fields)
    }
}

pub fn list_jobs(conn: &Connection) -> ApiResult<Vec<Job>> {
    Ok(Job::list_all(conn)?)
}

pub fn jobs_by_user(conn: &Connection, user_id: i64) -> ApiResult<Vec<Job>> {
    Ok(Job::by_user(conn, user_id)?)
}

pub fn job_applications(conn: &Connection, job_id: i64) -> ApiResult<Vec<JobApplication>> {
    Ok(JobApplication::for_job(conn, job_id)?)
}

/// Validates the posting and enforces the role policy: the poster must
/// exist and must not hold the student role.
pub fn post_job(conn: &Connection, req: NewJobRequest) -> ApiResult<i64> {
    require_non_empty(&req.title, "title")?;
    require_non_empty(&req.company, "company")?;
    require_non_empty(&req.job_type, "type")?;
    require_non_empty(&req.location, "location")?;
    require_non_empty(&req.description, "description")?;
    require_non_empty(&req.deadline, "deadline")?;
    validate_salary(req.salary)?;
    validate_deadline(&req.deadline)?;

    match User::role_of(conn, req.posted_by)? {
        None => return Err(ApiError::unauthorized("User not found or unauthorized.")),
        Some(role) if role == ROLE_STUDENT => {
            return Err(ApiError::forbidden("Students are not allowed to post jobs."));
        }
        Some(_) => {}
    }

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
            posted_by: Some(req.posted_by),
            deadline: req.deadline,
            status: "active".to_string(),
        },
    )?;
    tracing::info!("job {} posted by user {}", id, req.posted_by);
    Ok(id)
}

pub fn update_job(conn: &Connection, job_id: i64, patch: JobPatch) -> ApiResult<()> {
    if !Job::exists(conn, job_id)? {
        return Err(ApiError::not_found("Job not found."));
    }
    let fields = patch.into_fields()?;
    if fields.is_empty() {
        return Err(ApiError::validation("No fields provided to update."));
    }
    Job::update_fields(conn, job_id, &fields)?;
    Ok(())
}

pub fn delete_job(conn: &Connection, job_id: i64) -> ApiResult<()> {
    if !Job::exists(conn, job_id)? {
        return Err(ApiError::not_found("Job not found."));
    }
    Job::delete(conn, job_id)?;
    tracing::info!("job {} deleted", job_id);
    Ok(())
}

pub fn apply_to_job(
    conn: &Connection,
    job_id: i64,
    user_id: i64,
    cover_letter: &str,
) -> ApiResult<()> {
    if Job::find_by_id(conn, job_id)?.is_none() {
        return Err(ApiError::not_found("Job not found."));
    }
    if JobApplication::exists(conn, job_id, user_id)? {
        return Err(ApiError::conflict("You have already applied for this job."));
    }
    JobApplication::insert(conn, job_id, user_id, cover_letter)?;
    tracing::info!("user {} applied to job {}", user_id, job_id);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::users::NewUser;
    use crate::db;

    pub(crate) fn insert_user(conn: &Connection, email: &str, role: &str) -> i64 {
        User::insert(
            conn,
            &NewUser {
                first_name: "Test".into(),
                last_name: "User".into(),
                gender: String::new(),
                email: email.into(),
                phone_number: String::new(),
                nid: String::new(),
                varsity_id: String::new(),
                university: String::new(),
                department: String::new(),
                role: role.into(),
                password: "irrelevant-hash".into(),
                confirm_token: None,
                varsity_id_picture: String::new(),
                is_confirmed: true,
            },
        )
        .unwrap()
    }

    pub(crate) fn future_date() -> String {
        (Utc::now().date_naive() + chrono::Duration::days(30))
            .format("%Y-%m-%d")
            .to_string()
    }

    pub(crate) fn job_request(posted_by: i64) -> NewJobRequest {
        NewJobRequest {
            title: "Backend Engineer".into(),
            company: "Acme".into(),
            job_type: "full-time".into(),
            salary: 90_000,
            location: "Dhaka".into(),
            description: "Build things.".into(),
            requirements: "Rust".into(),
            posted_by,
            deadline: future_date(),
        }
    }

    #[test]
    fn post_and_list_newest_first() {
        let conn = db::open_in_memory();
        let poster = insert_user(&conn, "f@example.com", "faculty");

        let first = post_job(&conn, job_request(poster)).unwrap();
        let second = post_job(&conn, job_request(poster)).unwrap();

        let jobs = list_jobs(&conn).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second);
        assert_eq!(jobs[1].id, first);
    }

    #[test]
    fn students_cannot_post() {
        let conn = db::open_in_memory();
        let student = insert_user(&conn, "s@example.com", "student");
        let err = post_job(&conn, job_request(student)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(Job::count(&conn).unwrap(), 0);
    }

    #[test]
    fn unknown_poster_is_unauthorized() {
        let conn = db::open_in_memory();
        let err = post_job(&conn, job_request(9999)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn negative_salary_writes_nothing() {
        let conn = db::open_in_memory();
        let poster = insert_user(&conn, "f@example.com", "faculty");
        let mut req = job_request(poster);
        req.salary = -5;
        let err = post_job(&conn, req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(Job::count(&conn).unwrap(), 0);
    }

    #[test]
    fn past_deadline_writes_nothing() {
        let conn = db::open_in_memory();
        let poster = insert_user(&conn, "f@example.com", "faculty");
        let mut req = job_request(poster);
        req.deadline = "2020-01-01".into();
        let err = post_job(&conn, req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(Job::count(&conn).unwrap(), 0);

        let mut req = job_request(poster);
        req.deadline = "not-a-date".into();
        assert!(matches!(
            post_job(&conn, req).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn patch_overrides_only_present_fields() {
        let conn = db::open_in_memory();
        let poster = insert_user(&conn, "f@example.com", "faculty");
        let id = post_job(&conn, job_request(poster)).unwrap();

        update_job(
            &conn,
            id,
            JobPatch {
                title: Some("Senior Backend Engineer".into()),
                salary: Some(120_000),
                ..JobPatch::default()
            },
        )
        .unwrap();

        let job = Job::find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(job.title, "Senior Backend Engineer");
        assert_eq!(job.salary, 120_000);
        assert_eq!(job.company, "Acme");
        assert_eq!(job.location, "Dhaka");
    }

    #[test]
    fn update_missing_job_is_not_found() {
        let conn = db::open_in_memory();
        let err = update_job(
            &conn,
            404,
            JobPatch {
                title: Some("x".into()),
                ..JobPatch::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn empty_patch_is_rejected() {
        let conn = db::open_in_memory();
        let poster = insert_user(&conn, "f@example.com", "faculty");
        let id = post_job(&conn, job_request(poster)).unwrap();
        let err = update_job(&conn, id, JobPatch::default()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn double_application_conflicts() {
        let conn = db::open_in_memory();
        let poster = insert_user(&conn, "f@example.com", "faculty");
        let applicant = insert_user(&conn, "s@example.com", "student");
        let job = post_job(&conn, job_request(poster)).unwrap();

        apply_to_job(&conn, job, applicant, "please hire me").unwrap();
        let err = apply_to_job(&conn, job, applicant, "again").unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let apps = job_applications(&conn, job).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].status, "applied");
        assert_eq!(apps[0].email, "s@example.com");
    }

    #[test]
    fn delete_cascades_applications() {
        let conn = db::open_in_memory();
        let poster = insert_user(&conn, "f@example.com", "faculty");
        let applicant = insert_user(&conn, "s@example.com", "student");
        let job = post_job(&conn, job_request(poster)).unwrap();
        apply_to_job(&conn, job, applicant, "").unwrap();

        delete_job(&conn, job).unwrap();
        assert!(!Job::exists(&conn, job).unwrap());
        assert!(job_applications(&conn, job).unwrap().is_empty());

        let err = delete_job(&conn, job).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn my_jobs_filters_by_owner() {
        let conn = db::open_in_memory();
        let a = insert_user(&conn, "a@example.com", "faculty");
        let b = insert_user(&conn, "b@example.com", "faculty");
        post_job(&conn, job_request(a)).unwrap();
        post_job(&conn, job_request(b)).unwrap();

        let mine = jobs_by_user(&conn, a).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].posted_by, Some(a));
    }
}
