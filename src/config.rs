use std::env;

use crate::error::ApiError;

/// Runtime settings, read once at startup from the environment (`.env`
/// supported via dotenv). `SESSION_SECRET` and `HASH_SECRET` have no
/// default; everything else falls back to a local-development value.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: String,
    pub bind_addr: String,
    pub base_url: String,
    pub upload_dir: String,
    pub session_secret: String,
    pub smtp_server: String,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub from_email: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Settings {
    pub fn from_env() -> Result<Settings, ApiError> {
        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| ApiError::validation("SESSION_SECRET must be set"))?;
        // enc reads HASH_SECRET on its own; failing here keeps a
        // misconfigured server from booting at all.
        env::var("HASH_SECRET").map_err(|_| ApiError::validation("HASH_SECRET must be set"))?;

        Ok(Settings {
            database_path: var_or("JOBBOARD_DB", "jobboard.db"),
            bind_addr: var_or("JOBBOARD_BIND", "127.0.0.1:8080"),
            base_url: var_or("JOBBOARD_BASE_URL", "http://localhost:8080"),
            upload_dir: var_or("JOBBOARD_UPLOAD_DIR", "uploads"),
            session_secret,
            smtp_server: var_or("SMTP_SERVER", "localhost"),
            smtp_user: var_or("SMTP_USER", ""),
            smtp_pass: var_or("SMTP_PASS", ""),
            from_email: var_or("FROM_EMAIL", "noreply@jobboard.local"),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Settings {
        Settings {
            database_path: ":memory:".into(),
            bind_addr: "127.0.0.1:0".into(),
            base_url: "http://localhost:8080".into(),
            upload_dir: std::env::temp_dir()
                .join("jobboard-test-uploads")
                .to_string_lossy()
                .into_owned(),
            session_secret: "unit-test-secret".into(),
            smtp_server: "localhost".into(),
            smtp_user: String::new(),
            smtp_pass: String::new(),
            from_email: "noreply@jobboard.local".into(),
        }
    }
}
