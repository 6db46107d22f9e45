use std::fs;
use std::path::Path;

use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::state::AppState;

#[get("/health_check")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp()
    }))
}

#[get("/uploads/{filename}")]
pub async fn serve_upload(
    state: web::Data<AppState>,
    filename: web::Path<String>,
) -> HttpResponse {
    let filename = filename.into_inner();
    // Stored names are flat; anything with path structure is not ours.
    if filename.contains('/') || filename.contains("..") {
        return HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "message": "File not found"
        }));
    }

    let filepath = Path::new(&state.settings.upload_dir).join(&filename);
    match fs::read(&filepath) {
        Ok(content) => {
            let content_type = match filepath.extension().and_then(|e| e.to_str()) {
                Some("jpg") | Some("jpeg") => "image/jpeg",
                Some("png") => "image/png",
                Some("gif") => "image/gif",
                _ => "application/octet-stream",
            };
            HttpResponse::Ok().content_type(content_type).body(content)
        }
        Err(_) => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "message": "File not found"
        })),
    }
}
