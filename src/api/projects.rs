use actix_web::{web, HttpResponse, ResponseError};

use super::list_response;
use crate::database::MongoDB;
use crate::models::{EditUpdateInput, UpdateInput};
use crate::services::project_service::{self, ProjectQuery};

#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "Projects",
    params(ProjectQuery),
    responses((status = 200, description = "Active projects matching the filters"))
)]
pub async fn list_projects(db: web::Data<MongoDB>, query: web::Query<ProjectQuery>) -> HttpResponse {
    log::info!(
        "📋 GET /projects - category: {:?}, search: {:?}, sort: {:?}",
        query.category,
        query.search,
        query.sort_by
    );

    match project_service::list_projects(&db, &query).await {
        Ok(projects) => list_response(&projects),
        Err(e) => {
            log::error!("❌ Error listing projects: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/projects/featured",
    tag = "Projects",
    responses((status = 200, description = "Up to six featured active projects"))
)]
pub async fn featured_projects(db: web::Data<MongoDB>) -> HttpResponse {
    match project_service::featured_projects(&db).await {
        Ok(projects) => list_response(&projects),
        Err(e) => {
            log::error!("❌ Error listing featured projects: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project with creator details"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project(db: web::Data<MongoDB>, id: web::Path<String>) -> HttpResponse {
    match project_service::get_project(&db, &id).await {
        Ok(project) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": project
        })),
        Err(e) => {
            log::warn!("⚠️  GET /projects/{} failed: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}/updates",
    tag = "Projects",
    params(("id" = String, Path, description = "Project ID")),
    responses((status = 200, description = "Updates, newest first"))
)]
pub async fn project_updates(db: web::Data<MongoDB>, id: web::Path<String>) -> HttpResponse {
    match project_service::project_updates(&db, &id).await {
        Ok(updates) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": updates
        })),
        Err(e) => {
            log::warn!("⚠️  GET /projects/{}/updates failed: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/projects/{id}/updates",
    tag = "Projects",
    params(("id" = String, Path, description = "Project ID")),
    request_body = UpdateInput,
    responses(
        (status = 201, description = "Update posted"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_update(
    db: web::Data<MongoDB>,
    id: web::Path<String>,
    body: web::Json<UpdateInput>,
) -> HttpResponse {
    log::info!("📝 POST /projects/{}/updates - {}", id, body.title);

    match project_service::add_update(&db, &id, body.into_inner()).await {
        Ok(update) => {
            log::info!("✅ Update {} posted on project {}", update.id, id);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": "Update added successfully",
                "data": update
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to add update to {}: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/projects/{project_id}/updates/{update_id}",
    tag = "Projects",
    params(
        ("project_id" = String, Path, description = "Project ID"),
        ("update_id" = String, Path, description = "Update ID")
    ),
    request_body = EditUpdateInput,
    responses(
        (status = 200, description = "Update edited"),
        (status = 404, description = "Project or update not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn edit_update(
    db: web::Data<MongoDB>,
    path: web::Path<(String, String)>,
    body: web::Json<EditUpdateInput>,
) -> HttpResponse {
    let (project_id, update_id) = path.into_inner();

    match project_service::edit_update(&db, &project_id, &update_id, body.into_inner()).await {
        Ok(update) => {
            log::info!("✅ Update {} edited on project {}", update_id, project_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Update modified successfully",
                "data": update
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to edit update {}: {}", update_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/projects/{project_id}/updates/{update_id}",
    tag = "Projects",
    params(
        ("project_id" = String, Path, description = "Project ID"),
        ("update_id" = String, Path, description = "Update ID")
    ),
    responses(
        (status = 200, description = "Update deleted"),
        (status = 404, description = "Project or update not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_update(db: web::Data<MongoDB>, path: web::Path<(String, String)>) -> HttpResponse {
    let (project_id, update_id) = path.into_inner();

    match project_service::delete_update(&db, &project_id, &update_id).await {
        Ok(()) => {
            log::info!("🗑️  Update {} deleted from project {}", update_id, project_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Update deleted successfully"
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to delete update {}: {}", update_id, e);
            e.error_response()
        }
    }
}
