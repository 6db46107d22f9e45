use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Full `users` row. Never serialized to a client as-is; use
/// [`User::public`] for anything that leaves the server.
#[derive(Debug)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub email: String,
    pub phone_number: String,
    pub nid: String,
    pub varsity_id: String,
    pub university: String,
    pub department: String,
    pub role: String,
    pub password: String,
    pub confirm_token: Option<String>,
    pub varsity_id_picture: String,
    pub is_confirmed: bool,
}

/// Client-facing projection: the user record minus credential material.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub email: String,
    pub phone_number: String,
    pub nid: String,
    pub varsity_id: String,
    pub varsity_id_picture: String,
    pub university: String,
    pub department: String,
    pub role: String,
}

/// Row shape for the admin user listing.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

/// Insert payload; `password` is already hashed by the caller.
#[derive(Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub email: String,
    pub phone_number: String,
    pub nid: String,
    pub varsity_id: String,
    pub university: String,
    pub department: String,
    pub role: String,
    pub password: String,
    pub confirm_token: Option<String>,
    pub varsity_id_picture: String,
    pub is_confirmed: bool,
}

/// Columns the uniqueness probe may inspect. Modeling the allowlist as a
/// sum type keeps arbitrary column names out of the SQL.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueField {
    Email,
    PhoneNumber,
    Nid,
    VarsityId,
}

impl UniqueField {
    pub fn column(self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::PhoneNumber => "phone_number",
            UniqueField::Nid => "nid",
            UniqueField::VarsityId => "varsity_id",
        }
    }
}

const USER_COLUMNS: &str = "id, first_name, last_name, gender, email, phone_number, nid, \
     varsity_id, university, department, role, password, confirm_token, \
     varsity_id_picture, is_confirmed";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        gender: row.get(3)?,
        email: row.get(4)?,
        phone_number: row.get(5)?,
        nid: row.get(6)?,
        varsity_id: row.get(7)?,
        university: row.get(8)?,
        department: row.get(9)?,
        role: row.get(10)?,
        password: row.get(11)?,
        confirm_token: row.get(12)?,
        varsity_id_picture: row.get(13)?,
        is_confirmed: row.get::<_, i64>(14)? != 0,
    })
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            nid: self.nid.clone(),
            varsity_id: self.varsity_id.clone(),
            varsity_id_picture: self.varsity_id_picture.clone(),
            university: self.university.clone(),
            department: self.department.clone(),
            role: self.role.clone(),
        }
    }

    pub fn email_exists(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
        let mut stmt = conn.prepare("SELECT 1 FROM users WHERE email = ?1")?;
        stmt.exists(params![email])
    }

    pub fn email_exists_for_other(
        conn: &Connection,
        email: &str,
        user_id: i64,
    ) -> rusqlite::Result<bool> {
        let mut stmt = conn.prepare("SELECT 1 FROM users WHERE email = ?1 AND id != ?2")?;
        stmt.exists(params![email, user_id])
    }

    pub fn field_exists(
        conn: &Connection,
        field: UniqueField,
        value: &str,
    ) -> rusqlite::Result<bool> {
        let sql = format!("SELECT 1 FROM users WHERE {} = ?1", field.column());
        let mut stmt = conn.prepare(&sql)?;
        stmt.exists(params![value])
    }

    pub fn insert(conn: &Connection, user: &NewUser) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO users (
                first_name, last_name, gender, email, phone_number,
                nid, varsity_id, university, department, role,
                password, confirm_token, varsity_id_picture, is_confirmed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                user.first_name,
                user.last_name,
                user.gender,
                user.email,
                user.phone_number,
                user.nid,
                user.varsity_id,
                user.university,
                user.department,
                user.role,
                user.password,
                user.confirm_token,
                user.varsity_id_picture,
                user.is_confirmed as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        conn.query_row(&sql, params![email], from_row).optional()
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        conn.query_row(&sql, params![id], from_row).optional()
    }

    /// Flips the confirmation flag for an exact (email, token) match.
    /// Returns the number of rows changed; zero means the pair never
    /// matched an unconfirmed account.
    pub fn confirm(conn: &Connection, email: &str, token: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE users SET is_confirmed = 1
             WHERE email = ?1 AND confirm_token = ?2 AND is_confirmed = 0",
            params![email, token],
        )
    }

    pub fn update_password(conn: &Connection, user_id: i64, hash: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE users SET password = ?1 WHERE id = ?2",
            params![hash, user_id],
        )
    }

    pub fn role_of(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<String>> {
        conn.query_row(
            "SELECT role FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
    }

    pub fn exists(conn: &Connection, user_id: i64) -> rusqlite::Result<bool> {
        let mut stmt = conn.prepare("SELECT 1 FROM users WHERE id = ?1")?;
        stmt.exists(params![user_id])
    }

    pub fn list_summaries(conn: &Connection) -> rusqlite::Result<Vec<UserSummary>> {
        let mut stmt = conn.prepare(
            "SELECT id, first_name, last_name, email, role, created_at
             FROM users ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    /// Partial update over an explicit (column, value) list, mirroring the
    /// patch DTOs at the service layer. Empty input is a caller bug caught
    /// upstream; here it is just a no-op.
    pub fn update_fields(
        conn: &Connection,
        user_id: i64,
        fields: &[(&str, Value)],
    ) -> rusqlite::Result<usize> {
        if fields.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> =
            fields.iter().map(|(col, _)| format!("{col} = ?")).collect();
        let sql = format!("UPDATE users SET {} WHERE id = ?", assignments.join(", "));
        let mut values: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
        values.push(Value::Integer(user_id));
        conn.execute(&sql, rusqlite::params_from_iter(values))
    }

    pub fn delete(conn: &Connection, user_id: i64) -> rusqlite::Result<usize> {
        conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])
    }

    pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
    }
}
