use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, StatusCode},
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::config::AppConfig;
use crate::services::auth_service::{verify_token, Claims};

pub const TOKEN_COOKIE: &str = "token";

/// Verifies the JWT from `Authorization: Bearer` or the `token` cookie and
/// stores the `Claims` in the request extensions.
#[derive(Clone, Copy)]
pub struct AuthMiddleware {
    require_admin: bool,
}

impl AuthMiddleware {
    pub fn protect() -> Self {
        Self { require_admin: false }
    }

    pub fn admin_only() -> Self {
        Self { require_admin: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            require_admin: self.require_admin,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    require_admin: bool,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        req.cookie(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

fn reject<B>(req: ServiceRequest, status: StatusCode, message: &str) -> ServiceResponse<EitherBody<B>> {
    let response = HttpResponse::build(status).json(serde_json::json!({
        "success": false,
        "message": message
    }));
    req.into_response(response).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(token) = bearer_token(&req) else {
            log::warn!("❌ No token provided for {}", req.path());
            return Box::pin(async move {
                Ok(reject(req, StatusCode::UNAUTHORIZED, "Not authorized, no token"))
            });
        };

        let Some(config) = req.app_data::<web::Data<AppConfig>>().cloned() else {
            log::error!("❌ AppConfig missing from app data");
            return Box::pin(async move {
                Ok(reject(req, StatusCode::INTERNAL_SERVER_ERROR, "Server misconfigured"))
            });
        };

        let claims = match verify_token(&token, &config.jwt) {
            Ok(claims) => claims,
            Err(e) => {
                let message = e.to_string();
                log::warn!("❌ Token rejected for {}: {}", req.path(), message);
                return Box::pin(async move { Ok(reject(req, StatusCode::UNAUTHORIZED, &message)) });
            }
        };

        if self.require_admin && !claims.is_admin() {
            log::warn!("⛔ Admin route {} denied for {}", req.path(), claims.email);
            return Box::pin(async move {
                Ok(reject(req, StatusCode::FORBIDDEN, "Access denied. Admin only."))
            });
        }

        req.extensions_mut().insert::<Claims>(claims);

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::services::auth_service::generate_jwt;
    use actix_web::{cookie::Cookie, test, App, HttpRequest};
    use mongodb::bson::oid::ObjectId;

    async fn whoami(req: HttpRequest) -> HttpResponse {
        let email = req
            .extensions()
            .get::<Claims>()
            .map(|c| c.email.clone())
            .unwrap_or_default();
        HttpResponse::Ok().body(email)
    }

    fn token_for(role: Role, config: &AppConfig) -> String {
        let user = User {
            id: Some(ObjectId::new()),
            name: "Meera".into(),
            email: "meera@example.com".into(),
            password: "x".into(),
            role,
            avatar: None,
            created_at: 0,
            updated_at: 0,
        };
        generate_jwt(&user, &config.jwt).unwrap()
    }

    macro_rules! app {
        ($config:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($config.clone()))
                    .service(
                        web::resource("/private")
                            .wrap(AuthMiddleware::protect())
                            .route(web::get().to(whoami)),
                    )
                    .service(
                        web::resource("/admin")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::get().to(whoami)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let config = crate::config::test_config();
        let app = app!(config);

        let res = test::call_service(&app, test::TestRequest::get().uri("/private").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Not authorized, no token");
    }

    #[actix_web::test]
    async fn test_bearer_token_passes_claims_through() {
        let config = crate::config::test_config();
        let token = token_for(Role::User, &config);
        let app = app!(config);

        let req = test::TestRequest::get()
            .uri("/private")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "meera@example.com");
    }

    #[actix_web::test]
    async fn test_cookie_token_is_accepted() {
        let config = crate::config::test_config();
        let token = token_for(Role::User, &config);
        let app = app!(config);

        let req = test::TestRequest::get()
            .uri("/private")
            .cookie(Cookie::new(TOKEN_COOKIE, token))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_garbage_token_is_unauthorized() {
        let config = crate::config::test_config();
        let app = app!(config);

        let req = test::TestRequest::get()
            .uri("/private")
            .insert_header((header::AUTHORIZATION, "Bearer not.a.jwt"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_admin_guard() {
        let config = crate::config::test_config();
        let user_token = token_for(Role::User, &config);
        let admin_token = token_for(Role::Admin, &config);
        let app = app!(config);

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", user_token)))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", admin_token)))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
