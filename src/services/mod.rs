use validator::ValidateEmail;

use crate::error::ApiError;

pub mod account;
pub mod admin;
pub mod jobs;
pub mod profile;

/// Timestamp format used for token expiries, matching the `datetime('now')`
/// defaults SQLite writes elsewhere in the schema.
pub(crate) const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn valid_email(email: &str) -> bool {
    email.validate_email()
}

pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("Missing required field: {field}.")));
    }
    Ok(())
}
