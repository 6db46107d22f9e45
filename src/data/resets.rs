use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

/// Stored reset token. Only the SHA-256 of the raw token ever touches the
/// database; the raw value exists solely inside the email link.
#[derive(Debug)]
pub struct ResetToken {
    pub user_id: i64,
    pub expires_at: String,
}

impl ResetToken {
    pub fn hash(raw_token: &str) -> String {
        Sha256::digest(raw_token.as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    pub fn insert(
        conn: &Connection,
        user_id: i64,
        token_hash: &str,
        expires_at: &str,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO password_resets (user_id, token_hash, expires_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, token_hash, expires_at],
        )
    }

    pub fn find_by_hash(
        conn: &Connection,
        token_hash: &str,
    ) -> rusqlite::Result<Option<ResetToken>> {
        conn.query_row(
            "SELECT user_id, expires_at FROM password_resets WHERE token_hash = ?1",
            params![token_hash],
            |row| {
                Ok(ResetToken {
                    user_id: row.get(0)?,
                    expires_at: row.get(1)?,
                })
            },
        )
        .optional()
    }

    pub fn delete_by_hash(conn: &Connection, token_hash: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "DELETE FROM password_resets WHERE token_hash = ?1",
            params![token_hash],
        )
    }
}
