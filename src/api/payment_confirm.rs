use actix_web::{web, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::documents::DocumentStore;
use crate::services::checkout_service::{self, CheckoutOutcome, ConfirmSessionRequest};

/// Called from the success page after Stripe redirects back with the session id
#[utoipa::path(
    post,
    path = "/api/payment-confirm/confirm-payment",
    tag = "Checkout",
    request_body = ConfirmSessionRequest,
    responses(
        (status = 200, description = "Donation recorded, or already processed"),
        (status = 400, description = "Missing session ID or payment not completed")
    )
)]
pub async fn confirm_payment(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    store: web::Data<DocumentStore>,
    body: web::Json<ConfirmSessionRequest>,
) -> HttpResponse {
    log::info!("🔍 POST /payment-confirm/confirm-payment - session: {:?}", body.session_id);

    match checkout_service::confirm_payment(&db, &config, &store, &body).await {
        Ok(CheckoutOutcome::AlreadyProcessed) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Payment already processed",
            "already_processed": true
        })),
        Ok(CheckoutOutcome::Recorded(donation)) => {
            log::info!(
                "🎉 Donation recorded: project {} now at {} from {} backers",
                donation.project_id,
                donation.new_raised_amount,
                donation.new_backers_count
            );
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Payment confirmed and project updated",
                "data": donation
            }))
        }
        Err(e) => {
            log::error!("❌ Payment confirmation failed: {}", e);
            e.error_response()
        }
    }
}
