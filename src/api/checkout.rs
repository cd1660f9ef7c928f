use actix_web::{web, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::services::auth_service::Claims;
use crate::services::checkout_service::{self, CreateSessionRequest, SessionCreated, SessionSummary};

#[utoipa::path(
    post,
    path = "/api/checkout/create-session",
    tag = "Checkout",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Checkout Session created", body = SessionCreated),
        (status = 400, description = "Project ID and amount are required"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_session(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateSessionRequest>,
) -> HttpResponse {
    log::info!(
        "🛒 POST /checkout/create-session - project: {:?}, amount: {:?}, user: {}",
        body.project_id,
        body.amount,
        user.email
    );

    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match checkout_service::create_session(&db, &config, user_id, &body).await {
        Ok(session) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "session_id": session.session_id,
            "url": session.url
        })),
        Err(e) => {
            log::error!("❌ Checkout session creation failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/checkout/session/{session_id}",
    tag = "Checkout",
    params(("session_id" = String, Path, description = "Stripe Checkout Session ID")),
    responses((status = 200, description = "Session status", body = SessionSummary))
)]
pub async fn session_details(config: web::Data<AppConfig>, session_id: web::Path<String>) -> HttpResponse {
    match checkout_service::session_details(&config, &session_id).await {
        Ok(session) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "session": session
        })),
        Err(e) => {
            log::warn!("❌ Failed to retrieve session {}: {}", session_id, e);
            e.error_response()
        }
    }
}
