use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use super::{list_response, pdf_attachment};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::documents::DocumentStore;
use crate::models::{CampaignInput, ReviewRequest};
use crate::services::auth_service::Claims;
use crate::services::campaign_request_service;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusFilter {
    /// pending, approved or rejected
    pub status: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/campaign-requests",
    tag = "Campaign Requests",
    request_body = CampaignInput,
    responses(
        (status = 201, description = "Request submitted for review"),
        (status = 400, description = "Invalid campaign data")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CampaignInput>,
) -> HttpResponse {
    log::info!("📝 POST /campaign-requests - '{}' by {}", body.title, user.email);

    let creator = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match campaign_request_service::submit(&db, creator, body.into_inner()).await {
        Ok(request) => {
            log::info!("✅ Campaign request submitted: {}", request.id);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": "Campaign request submitted successfully. Admin will review it soon.",
                "data": request
            }))
        }
        Err(e) => {
            log::warn!("❌ Campaign request rejected on submit: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/campaign-requests/my-requests",
    tag = "Campaign Requests",
    responses((status = 200, description = "The caller's requests, newest first")),
    security(("bearer_auth" = []))
)]
pub async fn my_requests(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    let creator = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match campaign_request_service::my_requests(&db, creator).await {
        Ok(requests) => list_response(&requests),
        Err(e) => {
            log::error!("❌ Error listing requests for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/campaign-requests",
    tag = "Campaign Requests",
    params(StatusFilter),
    responses((status = 200, description = "All requests, optionally filtered by status")),
    security(("bearer_auth" = []))
)]
pub async fn all_requests(db: web::Data<MongoDB>, query: web::Query<StatusFilter>) -> HttpResponse {
    match campaign_request_service::all_requests(&db, query.status.as_deref()).await {
        Ok(requests) => list_response(&requests),
        Err(e) => {
            log::warn!("❌ Error listing campaign requests: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/campaign-requests/{id}",
    tag = "Campaign Requests",
    params(("id" = String, Path, description = "Campaign request ID")),
    responses(
        (status = 200, description = "The request"),
        (status = 403, description = "Neither the creator nor an admin"),
        (status = 404, description = "Campaign request not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_request(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    id: web::Path<String>,
) -> HttpResponse {
    match campaign_request_service::get_request(&db, &user, &id).await {
        Ok(request) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": request
        })),
        Err(e) => {
            log::warn!("⚠️  GET /campaign-requests/{} failed: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/campaign-requests/{id}/approve",
    tag = "Campaign Requests",
    params(("id" = String, Path, description = "Campaign request ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Approved; the project and certificate were created"),
        (status = 400, description = "Request is no longer pending"),
        (status = 404, description = "Campaign request not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    store: web::Data<DocumentStore>,
    id: web::Path<String>,
    body: Option<web::Json<ReviewRequest>>,
) -> HttpResponse {
    log::info!("🔍 PUT /campaign-requests/{}/approve by {}", id, user.email);

    let reviewer = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let admin_notes = body.and_then(|b| b.into_inner().admin_notes);

    match campaign_request_service::approve(&db, &config, &store, reviewer, &id, admin_notes).await {
        Ok(result) => {
            log::info!("✅ Campaign request {} approved, project {}", id, result.project.id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Campaign request approved and project created",
                "data": result
            }))
        }
        Err(e) => {
            log::warn!("❌ Approval of {} failed: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/campaign-requests/{id}/reject",
    tag = "Campaign Requests",
    params(("id" = String, Path, description = "Campaign request ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Rejected"),
        (status = 400, description = "Request is no longer pending"),
        (status = 404, description = "Campaign request not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    id: web::Path<String>,
    body: Option<web::Json<ReviewRequest>>,
) -> HttpResponse {
    log::info!("🔍 PUT /campaign-requests/{}/reject by {}", id, user.email);

    let reviewer = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let admin_notes = body.and_then(|b| b.into_inner().admin_notes);

    match campaign_request_service::reject(&db, reviewer, &id, admin_notes).await {
        Ok(request) => {
            log::info!("✅ Campaign request {} rejected", id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Campaign request rejected",
                "data": request
            }))
        }
        Err(e) => {
            log::warn!("❌ Rejection of {} failed: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/campaign-requests/{id}",
    tag = "Campaign Requests",
    params(("id" = String, Path, description = "Campaign request ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 400, description = "Creators can only delete pending requests"),
        (status = 403, description = "Neither the creator nor an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    id: web::Path<String>,
) -> HttpResponse {
    match campaign_request_service::delete(&db, &user, &id).await {
        Ok(()) => {
            log::info!("🗑️  Campaign request {} deleted by {}", id, user.email);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Campaign request deleted"
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to delete campaign request {}: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/campaign-requests/certificate/{id}",
    tag = "Campaign Requests",
    params(("id" = String, Path, description = "Campaign request ID")),
    responses(
        (status = 200, description = "Approval certificate PDF", content_type = "application/pdf"),
        (status = 400, description = "Campaign is not approved"),
        (status = 404, description = "Certificate not generated yet")
    ),
    security(("bearer_auth" = []))
)]
pub async fn certificate(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    store: web::Data<DocumentStore>,
    id: web::Path<String>,
) -> HttpResponse {
    match campaign_request_service::certificate(&db, &store, &user, &id).await {
        Ok(download) => {
            log::info!("📜 Certificate {} downloaded by {}", id, user.email);
            pdf_attachment(download.filename, download.bytes)
        }
        Err(e) => {
            log::warn!("❌ Certificate download for {} failed: {}", id, e);
            e.error_response()
        }
    }
}
