use actix_web::{web, HttpResponse, ResponseError};

use super::{list_response, pdf_attachment};
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::documents::DocumentStore;
use crate::services::auth_service::Claims;
use crate::services::payment_service::{
    self, ConfirmOutcome, ConfirmPaymentRequest, CreateIntentRequest, IntentCreated,
};

#[utoipa::path(
    post,
    path = "/api/payments/create-intent",
    tag = "Payments",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "PaymentIntent created", body = IntentCreated),
        (status = 400, description = "Amount and project_id are required"),
        (status = 404, description = "Project not found"),
        (status = 500, description = "Stripe not configured or unreachable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_intent(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateIntentRequest>,
) -> HttpResponse {
    log::info!(
        "💳 POST /payments/create-intent - project: {:?}, amount: {:?}",
        body.project_id,
        body.amount
    );

    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match payment_service::create_intent(&db, &config, user_id, &body).await {
        Ok(intent) => {
            log::info!("✅ PaymentIntent created: {}", intent.payment_intent_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "client_secret": intent.client_secret,
                "payment_intent_id": intent.payment_intent_id
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to create PaymentIntent: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    tag = "Payments",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded, or already recorded"),
        (status = 400, description = "Missing fields or payment not completed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn confirm(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    store: web::Data<DocumentStore>,
    body: web::Json<ConfirmPaymentRequest>,
) -> HttpResponse {
    log::info!("💳 POST /payments/confirm - intent: {:?}", body.payment_intent_id);

    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match payment_service::confirm_payment(&db, &config, &store, user_id, &body).await {
        Ok(ConfirmOutcome::AlreadyRecorded(payment)) => {
            log::info!("⚠️  Payment {} already recorded", payment.stripe_payment_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Payment already recorded",
                "data": payment
            }))
        }
        Ok(ConfirmOutcome::Recorded {
            payment,
            receipt_url,
            receipt_download_url,
        }) => {
            log::info!("🎉 Payment {} confirmed", payment.id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Payment confirmed successfully",
                "data": payment,
                "receipt_url": receipt_url,
                "receipt_download_url": receipt_download_url
            }))
        }
        Err(e) => {
            log::warn!("❌ Payment confirmation failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/payments/my-payments",
    tag = "Payments",
    responses((status = 200, description = "The caller's payments, newest first")),
    security(("bearer_auth" = []))
)]
pub async fn my_payments(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match payment_service::my_payments(&db, user_id).await {
        Ok(payments) => list_response(&payments),
        Err(e) => {
            log::error!("❌ Error listing payments for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/payments/all",
    tag = "Payments",
    responses((status = 200, description = "The latest 50 payments")),
    security(("bearer_auth" = []))
)]
pub async fn all_payments(db: web::Data<MongoDB>) -> HttpResponse {
    match payment_service::all_payments(&db).await {
        Ok(payments) => list_response(&payments),
        Err(e) => {
            log::error!("❌ Error listing payments: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/payments/receipt/{payment_id}",
    tag = "Payments",
    params(("payment_id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Receipt PDF", content_type = "application/pdf"),
        (status = 404, description = "Receipt not found")
    )
)]
pub async fn receipt(
    db: web::Data<MongoDB>,
    store: web::Data<DocumentStore>,
    payment_id: web::Path<String>,
) -> HttpResponse {
    match payment_service::receipt(&db, &store, &payment_id).await {
        Ok(download) => {
            log::info!("🧾 Receipt for payment {} downloaded", payment_id);
            pdf_attachment(download.filename, download.bytes)
        }
        Err(e) => {
            log::warn!("❌ Receipt download for {} failed: {}", payment_id, e);
            e.error_response()
        }
    }
}
