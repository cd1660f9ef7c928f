use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    web, HttpResponse, ResponseError,
};

use crate::config::AppConfig;
use crate::middleware::auth::TOKEN_COOKIE;
use crate::services::auth_service::{self, AuthResponse, Claims, LoginRequest, RegisterRequest};
use crate::{database::MongoDB, models::UserInfo};

fn token_cookie(token: &str, config: &AppConfig) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(config.frontend_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(Duration::days(config.jwt.expire_days))
        .finish()
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid input or user already exists")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&db, &config.jwt, &request).await {
        Ok(response) => {
            log::info!("✅ Registration successful: {}", response.user.email);
            HttpResponse::Created()
                .cookie(token_cookie(&response.token, &config))
                .json(response)
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &config.jwt, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", response.user.email);
            HttpResponse::Ok()
                .cookie(token_cookie(&response.token, &config))
                .json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Cookie cleared"))
)]
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(TOKEN_COOKIE, "").path("/").http_only(true).finish();
    cookie.make_removal();

    HttpResponse::Ok().cookie(cookie).json(serde_json::json!({
        "success": true,
        "message": "Logged out successfully"
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    match auth_service::get_current_user(&db, &user.sub).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": info
        })),
        Err(e) => {
            log::warn!("❌ /auth/me failed for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}
