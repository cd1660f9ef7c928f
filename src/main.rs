mod api;
mod cloudinary;
mod config;
mod database;
mod documents;
mod middleware;
mod models;
mod seeds;
mod services;
mod stripe;
mod utils;

use actix_cors::Cors;
use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::documents::DocumentStore;
use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();

    log::info!("🚀 Starting FundRise API...");
    config.log_summary();

    let db = database::MongoDB::new(&config.mongodb_uri).await.map_err(|e| {
        log::error!("❌ Failed to connect to MongoDB: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    log::info!("✅ MongoDB connected successfully");

    // 🌱 Make sure an admin can log in on a fresh database
    seeds::admin_seed::seed_default_admin(&db, &config.admin).await;

    let bind_addr = (config.host.clone(), config.port);
    log::info!("🌐 Server starting on {}:{}", config.host, config.port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", config.host, config.port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", config.host, config.port);

    let db_data = web::Data::new(db);
    let store_data = web::Data::new(DocumentStore::new(config.documents_dir.clone()));
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config_data.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::CONTENT_DISPOSITION,
            ])
            .supports_credentials()
            .max_age(3600);

        // Malformed JSON bodies get the same envelope as every other error
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into());

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(store_data.clone())
            .app_data(json_config)
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .route("/api/health", web::get().to(api::health::health_check))

            // ==================== AUTH ====================
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(api::auth::register))
                    .route("/login", web::post().to(api::auth::login))
                    .route("/logout", web::get().to(api::auth::logout))
                    .service(
                        web::resource("/me")
                            .wrap(AuthMiddleware::protect())
                            .route(web::get().to(api::auth::get_me))
                    )
            )

            // ==================== PROJECTS ====================
            .service(
                web::scope("/api/projects")
                    .route("", web::get().to(api::projects::list_projects))
                    .route("/featured", web::get().to(api::projects::featured_projects))
                    .service(
                        web::resource("/{id}/updates")
                            .guard(guard::Post())
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::post().to(api::projects::add_update))
                    )
                    .route("/{id}/updates", web::get().to(api::projects::project_updates))
                    .service(
                        web::resource("/{project_id}/updates/{update_id}")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::put().to(api::projects::edit_update))
                            .route(web::delete().to(api::projects::delete_update))
                    )
                    .route("/{id}", web::get().to(api::projects::get_project))
            )

            // ==================== ADMIN ====================
            .service(
                web::scope("/api/admin")
                    .service(
                        web::resource("/stats")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::get().to(api::admin::stats))
                    )
                    // Any signed-in user may create a project, listing them is admin-only
                    .service(
                        web::resource("/projects")
                            .guard(guard::Post())
                            .wrap(AuthMiddleware::protect())
                            .route(web::post().to(api::admin::create_project))
                    )
                    .service(
                        web::resource("/projects")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::get().to(api::admin::all_projects))
                    )
                    .service(
                        web::resource("/projects/{id}")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::put().to(api::admin::update_project))
                            .route(web::delete().to(api::admin::delete_project))
                    )
            )

            // ==================== CAMPAIGN REQUESTS ====================
            .service(
                web::scope("/api/campaign-requests")
                    .service(
                        web::resource("")
                            .guard(guard::Post())
                            .wrap(AuthMiddleware::protect())
                            .route(web::post().to(api::campaign_requests::submit))
                    )
                    .service(
                        web::resource("")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::get().to(api::campaign_requests::all_requests))
                    )
                    .service(
                        web::resource("/my-requests")
                            .wrap(AuthMiddleware::protect())
                            .route(web::get().to(api::campaign_requests::my_requests))
                    )
                    .service(
                        web::resource("/certificate/{id}")
                            .wrap(AuthMiddleware::protect())
                            .route(web::get().to(api::campaign_requests::certificate))
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::put().to(api::campaign_requests::approve))
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::put().to(api::campaign_requests::reject))
                    )
                    .service(
                        web::resource("/{id}")
                            .wrap(AuthMiddleware::protect())
                            .route(web::get().to(api::campaign_requests::get_request))
                            .route(web::delete().to(api::campaign_requests::delete))
                    )
            )

            // ==================== PAYMENTS ====================
            .service(
                web::scope("/api/payments")
                    // Receipt links are shared by email, so they stay public
                    .route("/receipt/{payment_id}", web::get().to(api::payments::receipt))
                    .service(
                        web::resource("/create-intent")
                            .wrap(AuthMiddleware::protect())
                            .route(web::post().to(api::payments::create_intent))
                    )
                    .service(
                        web::resource("/confirm")
                            .wrap(AuthMiddleware::protect())
                            .route(web::post().to(api::payments::confirm))
                    )
                    .service(
                        web::resource("/my-payments")
                            .wrap(AuthMiddleware::protect())
                            .route(web::get().to(api::payments::my_payments))
                    )
                    .service(
                        web::resource("/all")
                            .wrap(AuthMiddleware::admin_only())
                            .route(web::get().to(api::payments::all_payments))
                    )
            )

            // ==================== STRIPE CHECKOUT ====================
            .service(
                web::scope("/api/checkout")
                    .service(
                        web::resource("/create-session")
                            .wrap(AuthMiddleware::protect())
                            .route(web::post().to(api::checkout::create_session))
                    )
                    .route("/session/{session_id}", web::get().to(api::checkout::session_details))
            )
            .route(
                "/api/payment-confirm/confirm-payment",
                web::post().to(api::payment_confirm::confirm_payment),
            )
            .route("/api/webhook/stripe", web::post().to(api::webhook::stripe_webhook))

            // ==================== USER DASHBOARD ====================
            .service(
                web::scope("/api/user")
                    .wrap(AuthMiddleware::protect())
                    .route("/stats", web::get().to(api::users::stats))
                    .route("/projects", web::get().to(api::users::projects))
                    .route("/backed-projects", web::get().to(api::users::backed_projects))
                    .route("/analytics", web::get().to(api::users::analytics))
                    .route("/profile", web::put().to(api::users::update_profile))
                    .route("/password", web::put().to(api::users::update_password))
            )

            // ==================== UPLOADS ====================
            .service(
                web::scope("/api/upload")
                    .wrap(AuthMiddleware::protect())
                    .route("/image", web::post().to(api::uploads::upload_image))
                    .route("/images", web::post().to(api::uploads::upload_images))
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
