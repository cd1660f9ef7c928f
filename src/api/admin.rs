use actix_web::{web, HttpResponse, ResponseError};

use super::list_response;
use crate::database::MongoDB;
use crate::models::{CampaignInput, UpdateProjectRequest};
use crate::services::admin_service::{self, PlatformStats};
use crate::services::auth_service::Claims;

#[utoipa::path(
    post,
    path = "/api/admin/projects",
    tag = "Admin",
    request_body = CampaignInput,
    responses(
        (status = 201, description = "Project created"),
        (status = 400, description = "Invalid project data")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CampaignInput>,
) -> HttpResponse {
    log::info!("📝 POST /admin/projects - '{}' by {}", body.title, user.email);

    let creator = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match admin_service::create_project(&db, creator, body.into_inner()).await {
        Ok(project) => {
            log::info!("✅ Project created: {}", project.id);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "data": project
            }))
        }
        Err(e) => {
            log::warn!("❌ Project creation failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/projects",
    tag = "Admin",
    responses((status = 200, description = "Every project, newest first")),
    security(("bearer_auth" = []))
)]
pub async fn all_projects(db: web::Data<MongoDB>) -> HttpResponse {
    match admin_service::all_projects(&db).await {
        Ok(projects) => list_response(&projects),
        Err(e) => {
            log::error!("❌ Error listing projects for admin: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/projects/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Updated project"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_project(
    db: web::Data<MongoDB>,
    id: web::Path<String>,
    body: web::Json<UpdateProjectRequest>,
) -> HttpResponse {
    match admin_service::update_project(&db, &id, body.into_inner()).await {
        Ok(project) => {
            log::info!("✅ Project {} updated", id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "data": project
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to update project {}: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/projects/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project deleted"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_project(db: web::Data<MongoDB>, id: web::Path<String>) -> HttpResponse {
    match admin_service::delete_project(&db, &id).await {
        Ok(()) => {
            log::info!("🗑️  Project {} deleted", id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Project deleted successfully"
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to delete project {}: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    responses((status = 200, description = "Platform totals", body = PlatformStats)),
    security(("bearer_auth" = []))
)]
pub async fn stats(db: web::Data<MongoDB>) -> HttpResponse {
    match admin_service::platform_stats(&db).await {
        Ok(stats) => {
            log::info!(
                "📊 Stats: {} projects, {} users, {} raised",
                stats.total_projects,
                stats.total_users,
                stats.total_raised
            );
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "data": stats
            }))
        }
        Err(e) => {
            log::error!("❌ Error computing platform stats: {}", e);
            e.error_response()
        }
    }
}
