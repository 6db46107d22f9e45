use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub company: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub salary: i64,
    pub location: String,
    pub description: String,
    pub requirements: String,
    pub posted_by: Option<i64>,
    pub posted_date: String,
    pub deadline: String,
    pub status: String,
    /// Present only on the admin listing, where the poster's name is
    /// joined in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_by_name: Option<String>,
}

#[derive(Debug)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub job_type: String,
    pub salary: i64,
    pub location: String,
    pub description: String,
    pub requirements: String,
    pub posted_by: Option<i64>,
    pub deadline: String,
    pub status: String,
}

const JOB_COLUMNS: &str =
    "id, title, company, type, salary, location, description, requirements, \
     posted_by, posted_date, deadline, status";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        title: row.get(1)?,
        company: row.get(2)?,
        job_type: row.get(3)?,
        salary: row.get(4)?,
        location: row.get(5)?,
        description: row.get(6)?,
        requirements: row.get(7)?,
        posted_by: row.get(8)?,
        posted_date: row.get(9)?,
        deadline: row.get(10)?,
        status: row.get(11)?,
        posted_by_name: None,
    })
}

impl Job {
    pub fn insert(conn: &Connection, job: &NewJob) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO jobs (title, company, type, salary, location,
                               description, requirements, posted_by, deadline, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.title,
                job.company,
                job.job_type,
                job.salary,
                job.location,
                job.description,
                job.requirements,
                job.posted_by,
                job.deadline,
                job.status,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_all(conn: &Connection) -> rusqlite::Result<Vec<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY posted_date DESC, id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], from_row)?;
        rows.collect()
    }

    /// Admin listing: every job with the poster's display name joined in.
    pub fn list_with_posters(conn: &Connection) -> rusqlite::Result<Vec<Job>> {
        let sql = format!(
            "SELECT {}, u.first_name || ' ' || u.last_name
             FROM jobs j LEFT JOIN users u ON j.posted_by = u.id
             ORDER BY j.posted_date DESC, j.id DESC",
            JOB_COLUMNS
                .split(", ")
                .map(|c| format!("j.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let mut job = from_row(row)?;
            job.posted_by_name = row.get(12)?;
            Ok(job)
        })?;
        rows.collect()
    }

    pub fn by_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Job>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE posted_by = ?1
             ORDER BY posted_date DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], from_row)?;
        rows.collect()
    }

    pub fn find_by_id(conn: &Connection, job_id: i64) -> rusqlite::Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
        conn.query_row(&sql, params![job_id], from_row).optional()
    }

    pub fn exists(conn: &Connection, job_id: i64) -> rusqlite::Result<bool> {
        let mut stmt = conn.prepare("SELECT 1 FROM jobs WHERE id = ?1")?;
        stmt.exists(params![job_id])
    }

    pub fn update_fields(
        conn: &Connection,
        job_id: i64,
        fields: &[(&str, Value)],
    ) -> rusqlite::Result<usize> {
        if fields.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> =
            fields.iter().map(|(col, _)| format!("{col} = ?")).collect();
        let sql = format!("UPDATE jobs SET {} WHERE id = ?", assignments.join(", "));
        let mut values: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
        values.push(Value::Integer(job_id));
        conn.execute(&sql, rusqlite::params_from_iter(values))
    }

    /// Applications reference jobs, so they go first.
    pub fn delete(conn: &Connection, job_id: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "DELETE FROM job_applicants WHERE job_id = ?1",
            params![job_id],
        )?;
        conn.execute("DELETE FROM jobs WHERE id = ?1", params![job_id])
    }

    pub fn orphan_ownership(conn: &Connection, user_id: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE jobs SET posted_by = NULL WHERE posted_by = ?1",
            params![user_id],
        )
    }

    pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))
    }
}

/// Application joined with the applicant's identity, the shape the job
/// owner's listing wants.
#[derive(Debug, Serialize)]
pub struct JobApplication {
    pub id: i64,
    pub job_id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub cover_letter: String,
    pub status: String,
    pub applied_at: String,
}

impl JobApplication {
    pub fn exists(conn: &Connection, job_id: i64, user_id: i64) -> rusqlite::Result<bool> {
        let mut stmt =
            conn.prepare("SELECT 1 FROM job_applicants WHERE job_id = ?1 AND user_id = ?2")?;
        stmt.exists(params![job_id, user_id])
    }

    pub fn insert(
        conn: &Connection,
        job_id: i64,
        user_id: i64,
        cover_letter: &str,
    ) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO job_applicants (job_id, user_id, cover_letter, status)
             VALUES (?1, ?2, ?3, 'applied')",
            params![job_id, user_id, cover_letter],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn for_job(conn: &Connection, job_id: i64) -> rusqlite::Result<Vec<JobApplication>> {
        let mut stmt = conn.prepare(
            "SELECT a.id, a.job_id, a.user_id, u.first_name, u.last_name, u.email,
                    a.cover_letter, a.status, a.applied_at
             FROM job_applicants a
             JOIN users u ON a.user_id = u.id
             WHERE a.job_id = ?1
             ORDER BY a.applied_at DESC, a.id DESC",
        )?;
        let rows = stmt.query_map(params![job_id], |row| {
            Ok(JobApplication {
                id: row.get(0)?,
                job_id: row.get(1)?,
                user_id: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                email: row.get(5)?,
                cover_letter: row.get(6)?,
                status: row.get(7)?,
                applied_at: row.get(8)?,
            })
        })?;
        rows.collect()
    }
}
