use actix_web::{web, HttpResponse, ResponseError};

use super::list_response;
use crate::database::MongoDB;
use crate::services::auth_service::Claims;
use crate::services::user_service::{
    self, UpdatePasswordRequest, UpdateProfileRequest, UserAnalytics, UserStats,
};

#[utoipa::path(
    get,
    path = "/api/user/stats",
    tag = "User",
    responses((status = 200, description = "Dashboard totals for the caller", body = UserStats)),
    security(("bearer_auth" = []))
)]
pub async fn stats(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match user_service::stats(&db, user_id).await {
        Ok(stats) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": stats
        })),
        Err(e) => {
            log::error!("❌ Error fetching user stats for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user/projects",
    tag = "User",
    responses((status = 200, description = "Projects created by the caller")),
    security(("bearer_auth" = []))
)]
pub async fn projects(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match user_service::my_projects(&db, user_id).await {
        Ok(projects) => list_response(&projects),
        Err(e) => {
            log::error!("❌ Error fetching projects for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user/backed-projects",
    tag = "User",
    responses((status = 200, description = "The caller's completed contributions")),
    security(("bearer_auth" = []))
)]
pub async fn backed_projects(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match user_service::backed_projects(&db, user_id).await {
        Ok(payments) => list_response(&payments),
        Err(e) => {
            log::error!("❌ Error fetching backed projects for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user/analytics",
    tag = "User",
    responses((status = 200, description = "Chart series for the dashboard", body = UserAnalytics)),
    security(("bearer_auth" = []))
)]
pub async fn analytics(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match user_service::analytics(&db, user_id).await {
        Ok(analytics) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": analytics
        })),
        Err(e) => {
            log::error!("❌ Error fetching analytics for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/user/profile",
    tag = "User",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Email already in use")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match user_service::update_profile(&db, user_id, body.into_inner()).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Profile updated successfully",
            "data": info
        })),
        Err(e) => {
            log::warn!("❌ Profile update failed for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/user/password",
    tag = "User",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Missing or too short password"),
        (status = 401, description = "Current password is incorrect")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_password(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<UpdatePasswordRequest>,
) -> HttpResponse {
    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match user_service::update_password(&db, user_id, body.into_inner()).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Password updated successfully"
        })),
        Err(e) => {
            log::warn!("❌ Password update failed for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}
