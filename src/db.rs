use rusqlite::Connection;

/// One connection per request; nothing is shared between handlers.
pub fn open(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name         TEXT NOT NULL,
            last_name          TEXT NOT NULL,
            gender             TEXT NOT NULL DEFAULT '',
            email              TEXT NOT NULL UNIQUE,
            phone_number       TEXT NOT NULL DEFAULT '',
            nid                TEXT NOT NULL DEFAULT '',
            varsity_id         TEXT NOT NULL DEFAULT '',
            university         TEXT NOT NULL DEFAULT '',
            department         TEXT NOT NULL DEFAULT '',
            role               TEXT NOT NULL,
            password           TEXT NOT NULL,
            confirm_token      TEXT,
            varsity_id_picture TEXT NOT NULL DEFAULT '',
            is_confirmed       INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS jobs (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            title        TEXT NOT NULL,
            company      TEXT NOT NULL,
            type         TEXT NOT NULL,
            salary       INTEGER NOT NULL,
            location     TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            requirements TEXT NOT NULL DEFAULT '',
            posted_by    INTEGER,
            posted_date  TEXT NOT NULL DEFAULT (datetime('now')),
            deadline     TEXT NOT NULL,
            status       TEXT NOT NULL DEFAULT 'active'
        );

        CREATE TABLE IF NOT EXISTS job_applicants (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id       INTEGER NOT NULL,
            user_id      INTEGER NOT NULL,
            cover_letter TEXT NOT NULL DEFAULT '',
            status       TEXT NOT NULL DEFAULT 'applied',
            applied_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS password_resets (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL,
            token_hash TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
}

#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory database");
    init_schema(&conn).expect("schema");
    conn
}
