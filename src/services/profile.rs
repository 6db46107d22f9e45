use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Deserialize;

use crate::config::Settings;
use crate::data::users::{PublicUser, User};
use crate::error::{ApiError, ApiResult};

const MAX_IMAGE_BYTES: usize = 5_000_000;
const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// Override-or-keep patch over the self-service profile fields.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub nid: Option<String>,
    pub varsity_id: Option<String>,
    pub university: Option<String>,
    pub department: Option<String>,
}

/// A replacement ID picture, already read off the wire.
#[derive(Debug)]
pub struct UploadedImage {
    pub ext: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn get_profile(conn: &Connection, user_id: i64) -> ApiResult<PublicUser> {
    let user = User::find_by_id(conn, user_id)?
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    Ok(user.public())
}

fn stored_image_path(settings: &Settings, stored: &str) -> Option<PathBuf> {
    // Only the basename is trusted; the column may carry a legacy path.
    let name = Path::new(stored).file_name()?;
    Some(Path::new(&settings.upload_dir).join(name))
}

fn store_image(
    settings: &Settings,
    user_id: i64,
    image: &UploadedImage,
) -> ApiResult<String> {
    if !ALLOWED_IMAGE_TYPES.contains(&image.mime.as_str()) {
        return Err(ApiError::validation(
            "Invalid file type. Only JPG, PNG, GIF are allowed.",
        ));
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::validation(
            "File is too large. Maximum size is 5MB.",
        ));
    }

    let filename = format!("user_{}_{}.{}", user_id, Utc::now().timestamp(), image.ext);
    fs::create_dir_all(&settings.upload_dir)?;
    fs::write(Path::new(&settings.upload_dir).join(&filename), &image.bytes)?;
    Ok(filename)
}

/// Merges the patch over the stored record. A new image replaces the old
/// file on disk only after the new one is safely written.
pub fn update_profile(
    conn: &Connection,
    settings: &Settings,
    user_id: i64,
    patch: ProfilePatch,
    image: Option<UploadedImage>,
) -> ApiResult<PublicUser> {
    let current = User::find_by_id(conn, user_id)?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    let picture = match image {
        Some(image) => {
            let filename = store_image(settings, user_id, &image)?;
            if !current.varsity_id_picture.is_empty() {
                if let Some(old) = stored_image_path(settings, &current.varsity_id_picture) {
                    let _ = fs::remove_file(old);
                }
            }
            filename
        }
        None => current.varsity_id_picture.clone(),
    };

    let merged = |new: Option<String>, old: &str| new.unwrap_or_else(|| old.to_string());
    let fields: Vec<(&str, Value)> = vec![
        (
            "first_name",
            Value::Text(merged(patch.first_name, &current.first_name)),
        ),
        (
            "last_name",
            Value::Text(merged(patch.last_name, &current.last_name)),
        ),
        ("gender", Value::Text(merged(patch.gender, &current.gender))),
        (
            "phone_number",
            Value::Text(merged(patch.phone_number, &current.phone_number)),
        ),
        ("nid", Value::Text(merged(patch.nid, &current.nid))),
        (
            "varsity_id",
            Value::Text(merged(patch.varsity_id, &current.varsity_id)),
        ),
        (
            "university",
            Value::Text(merged(patch.university, &current.university)),
        ),
        (
            "department",
            Value::Text(merged(patch.department, &current.department)),
        ),
        ("varsity_id_picture", Value::Text(picture)),
    ];
    User::update_fields(conn, user_id, &fields)?;

    get_profile(conn, user_id)
}

/// Removes the uploaded image (if any) and then the account row. Jobs and
/// applications are left in place; only the admin path reconciles those.
pub fn delete_account(conn: &Connection, settings: &Settings, user_id: i64) -> ApiResult<()> {
    let user = User::find_by_id(conn, user_id)?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    if !user.varsity_id_picture.is_empty() {
        if let Some(path) = stored_image_path(settings, &user.varsity_id_picture) {
            let _ = fs::remove_file(path);
        }
    }
    User::delete(conn, user_id)?;
    tracing::info!("account {} deleted by its owner", user_id);
    Ok(())
}
