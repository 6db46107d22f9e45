use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{delete, get, post, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use futures_util::StreamExt;

use crate::auth;
use crate::db;
use crate::error::ApiError;
use crate::services::profile::{self, ProfilePatch, UploadedImage};
use crate::state::AppState;

const IMAGE_FIELD: &str = "varsity_id_picture";
// Streaming cap; the service re-validates the final size.
const MAX_UPLOAD_BYTES: usize = 5_000_000;

#[get("/api/v1/profile")]
pub async fn fetch(
    state: web::Data<AppState>,
    auth_header: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let session = auth::verify_session(&state.settings, auth_header.token())?;
    let conn = db::open(&state.settings.database_path)?;
    let profile = profile::get_profile(&conn, session.user_id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": profile })))
}

async fn read_field_bytes(
    field: &mut actix_multipart::Field,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| ApiError::validation(e.to_string()))?;
        if bytes.len() + data.len() > limit {
            return Err(ApiError::validation(
                "File is too large. Maximum size is 5MB.",
            ));
        }
        bytes.extend_from_slice(&data);
    }
    Ok(bytes)
}

/// Multipart update: text inputs plus an optional replacement ID picture.
/// The form carries `_method=UPDATE`, a tunnel the original frontend used
/// because HTML forms cannot send PATCH.
#[post("/api/v1/profile")]
pub async fn update(
    state: web::Data<AppState>,
    auth_header: BearerAuth,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let session = auth::verify_session(&state.settings, auth_header.token())?;

    let mut fields: HashMap<String, String> = HashMap::new();
    let mut image: Option<UploadedImage> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::validation(e.to_string()))?;
        let (name, filename) = {
            let cd = field.content_disposition();
            (
                cd.get_name().unwrap_or("").to_string(),
                cd.get_filename().map(|f| f.to_string()),
            )
        };

        if name == IMAGE_FIELD && filename.is_some() {
            let mime = field
                .content_type()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default();
            let ext = filename
                .as_deref()
                .and_then(|f| f.rsplit('.').next())
                .unwrap_or("")
                .to_string();
            let bytes = read_field_bytes(&mut field, MAX_UPLOAD_BYTES).await?;
            if !bytes.is_empty() {
                image = Some(UploadedImage { ext, mime, bytes });
            }
        } else {
            let bytes = read_field_bytes(&mut field, MAX_UPLOAD_BYTES).await?;
            fields.insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }

    match fields.remove("_method") {
        Some(method) if method.eq_ignore_ascii_case("UPDATE") => {}
        _ => {
            return Err(ApiError::validation(
                "Invalid request method for this endpoint.",
            ))
        }
    }

    let patch = ProfilePatch {
        first_name: fields.remove("first_name"),
        last_name: fields.remove("last_name"),
        gender: fields.remove("gender"),
        phone_number: fields.remove("phone_number"),
        nid: fields.remove("nid"),
        varsity_id: fields.remove("varsity_id"),
        university: fields.remove("university"),
        department: fields.remove("department"),
    };

    let conn = db::open(&state.settings.database_path)?;
    let updated = profile::update_profile(&conn, &state.settings, session.user_id, patch, image)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Profile updated successfully.",
        "data": updated
    })))
}

#[delete("/api/v1/profile")]
pub async fn remove(
    state: web::Data<AppState>,
    auth_header: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    let session = auth::verify_session(&state.settings, auth_header.token())?;
    let conn = db::open(&state.settings.database_path)?;
    profile::delete_account(&conn, &state.settings, session.user_id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Account deleted successfully."
    })))
}
