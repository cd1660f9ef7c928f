use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FundRise API",
        version = "1.0.0",
        description = "Crowdfunding platform backend. \n\n**Authentication:** Protected endpoints accept a JWT Bearer token or the `token` cookie set at login.\n\n**Features:**\n- Campaign submission and admin review\n- Project catalog with updates and rewards\n- Stripe Payment Intents, Checkout Sessions and webhooks\n- PDF receipts and approval certificates\n- Creator and backer dashboards\n- Cloudinary image uploads",
        contact(
            name = "FundRise Team",
            email = "support@fundrise.app"
        )
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::get_me,

        // Health
        crate::api::health::health_check,

        // Projects
        crate::api::projects::list_projects,
        crate::api::projects::featured_projects,
        crate::api::projects::get_project,
        crate::api::projects::project_updates,
        crate::api::projects::add_update,
        crate::api::projects::edit_update,
        crate::api::projects::delete_update,

        // Admin
        crate::api::admin::create_project,
        crate::api::admin::all_projects,
        crate::api::admin::update_project,
        crate::api::admin::delete_project,
        crate::api::admin::stats,

        // Campaign requests
        crate::api::campaign_requests::submit,
        crate::api::campaign_requests::my_requests,
        crate::api::campaign_requests::all_requests,
        crate::api::campaign_requests::get_request,
        crate::api::campaign_requests::approve,
        crate::api::campaign_requests::reject,
        crate::api::campaign_requests::delete,
        crate::api::campaign_requests::certificate,

        // Payments
        crate::api::payments::create_intent,
        crate::api::payments::confirm,
        crate::api::payments::my_payments,
        crate::api::payments::all_payments,
        crate::api::payments::receipt,

        // Checkout
        crate::api::checkout::create_session,
        crate::api::checkout::session_details,
        crate::api::payment_confirm::confirm_payment,
        crate::api::webhook::stripe_webhook,

        // User dashboard
        crate::api::users::stats,
        crate::api::users::projects,
        crate::api::users::backed_projects,
        crate::api::users::analytics,
        crate::api::users::update_profile,
        crate::api::users::update_password,

        // Uploads
        crate::api::uploads::upload_image,
        crate::api::uploads::upload_images,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::AuthResponse,
            crate::models::UserInfo,
            crate::models::Role,

            // Health
            crate::api::health::HealthResponse,

            // Projects and campaign requests
            crate::models::CampaignInput,
            crate::models::RewardInput,
            crate::models::UpdateProjectRequest,
            crate::models::UpdateInput,
            crate::models::EditUpdateInput,
            crate::models::UpdateKind,
            crate::models::ProjectStatus,
            crate::models::RequestStatus,
            crate::models::ReviewRequest,
            crate::services::admin_service::PlatformStats,

            // Payments
            crate::services::payment_service::CreateIntentRequest,
            crate::services::payment_service::IntentCreated,
            crate::services::payment_service::ConfirmPaymentRequest,
            crate::services::checkout_service::CreateSessionRequest,
            crate::services::checkout_service::SessionCreated,
            crate::services::checkout_service::SessionSummary,
            crate::services::checkout_service::ConfirmSessionRequest,
            crate::services::checkout_service::RecordedDonation,

            // User dashboard
            crate::services::user_service::UserStats,
            crate::services::user_service::RequestCounts,
            crate::services::user_service::UserAnalytics,
            crate::services::user_service::FundingPoint,
            crate::services::user_service::BackerPoint,
            crate::services::user_service::StatusSlice,
            crate::services::user_service::ContributionPoint,
            crate::services::user_service::CategoryPoint,
            crate::services::user_service::UpdateProfileRequest,
            crate::services::user_service::UpdatePasswordRequest,

            // Uploads
            crate::cloudinary::UploadedImage,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and session endpoints. Tokens are returned in the body and set as an HTTP-only cookie."),
        (name = "Health", description = "Liveness check for monitoring."),
        (name = "Projects", description = "Public project catalog plus creator and admin project updates."),
        (name = "Admin", description = "Admin-only project management and platform statistics."),
        (name = "Campaign Requests", description = "Campaign submission, review and approval certificates."),
        (name = "Payments", description = "Stripe Payment Intent flow and PDF receipts."),
        (name = "Checkout", description = "Stripe Checkout Session flow, including guest donations."),
        (name = "Webhook", description = "Signed Stripe event delivery."),
        (name = "User", description = "Creator and backer dashboard data and profile settings."),
        (name = "Upload", description = "Image uploads to Cloudinary."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/projects/{id}"));
        assert!(doc.paths.paths.contains_key("/api/webhook/stripe"));
        assert!(doc.paths.paths.contains_key("/api/campaign-requests/{id}/approve"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("CampaignInput"));
    }
}
