use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::services::auth_service::Claims;
use crate::services::upload_service;

#[utoipa::path(
    post,
    path = "/api/upload/image",
    tag = "Upload",
    request_body(content = String, description = "multipart/form-data with an `image` file field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded to Cloudinary"),
        (status = 400, description = "No file uploaded, or an invalid or oversized file")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_image(
    user: web::ReqData<Claims>,
    config: web::Data<AppConfig>,
    payload: Multipart,
) -> HttpResponse {
    log::info!("📥 Upload request received from {}", user.email);

    match upload_service::upload_image(&config, payload).await {
        Ok(image) => {
            log::info!("📷 Image URL: {}", image.url);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "image_url": image.url,
                "public_id": image.public_id,
                "filename": image.filename
            }))
        }
        Err(e) => {
            log::warn!("❌ Upload error: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/upload/images",
    tag = "Upload",
    request_body(content = String, description = "multipart/form-data with up to 5 `images` file fields", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded to Cloudinary"),
        (status = 400, description = "No files uploaded, or an invalid or oversized file")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_images(
    user: web::ReqData<Claims>,
    config: web::Data<AppConfig>,
    payload: Multipart,
) -> HttpResponse {
    log::info!("📥 Multi-image upload request received from {}", user.email);

    match upload_service::upload_images(&config, payload).await {
        Ok(images) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "images": images
        })),
        Err(e) => {
            log::warn!("❌ Upload error: {}", e);
            e.error_response()
        }
    }
}
