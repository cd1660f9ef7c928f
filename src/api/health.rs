use actix_web::{HttpResponse, Responder};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".to_string(),
        message: "Server is running".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[actix_web::test]
    async fn test_health_reports_ok() {
        let app = test::init_service(App::new().route("/api/health", web::get().to(health_check))).await;
        let res: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(res["status"], "OK");
        assert_eq!(res["message"], "Server is running");
        assert_eq!(res["service"], "fundrise-api");
    }
}
