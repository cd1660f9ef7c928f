use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::documents::DocumentStore;
use crate::services::checkout_service::{self, CheckoutOutcome};
use crate::stripe::{webhook, CheckoutSession, PaymentIntent, StripeEvent};
use crate::utils::AppError;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

fn webhook_error(status: StatusCode, message: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/plain; charset=utf-8")
        .body(format!("Webhook Error: {}", message))
}

async fn handle_checkout_completed(
    db: &MongoDB,
    store: &DocumentStore,
    event: &StripeEvent,
) -> Result<(), AppError> {
    let session: CheckoutSession = serde_json::from_value(event.data.object.clone())
        .map_err(|e| AppError::Validation(format!("Malformed checkout session: {}", e)))?;

    log::info!(
        "💳 Checkout session completed: {} (status: {}, project: {:?}, amount: {:?})",
        session.id,
        session.payment_status,
        session.client_reference_id,
        session.amount_total
    );

    if !session.is_paid() {
        log::warn!("⏳ Session {} completed without payment yet, skipping", session.id);
        return Ok(());
    }

    match checkout_service::record_checkout_session(db, store, &session).await? {
        CheckoutOutcome::AlreadyProcessed => {
            log::info!("⚠️  Session {} was already recorded", session.id)
        }
        CheckoutOutcome::Recorded(donation) => log::info!(
            "🎉 Webhook recorded payment {}: project {} raised {}",
            donation.payment_id,
            donation.project_id,
            donation.new_raised_amount
        ),
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/webhook/stripe",
    tag = "Webhook",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Event received"),
        (status = 400, description = "Signature verification failed")
    )
)]
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    store: web::Data<DocumentStore>,
) -> HttpResponse {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let now = chrono::Utc::now().timestamp();
    let event = match webhook::construct_event(
        &body,
        signature,
        config.stripe.webhook_secret.as_deref(),
        now,
    ) {
        Ok(event) => event,
        Err(e) => {
            log::error!("❌ Webhook Error: {}", e);
            return webhook_error(StatusCode::BAD_REQUEST, e);
        }
    };

    log::info!("📨 Webhook received: {}", event.event_type);

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            if let Err(e) = handle_checkout_completed(&db, &store, &event).await {
                // Server-side failures are surfaced so Stripe redelivers the event
                if e.status_code().is_server_error() {
                    log::error!("❌ Failed to record checkout session: {}", e);
                    return webhook_error(StatusCode::INTERNAL_SERVER_ERROR, e);
                }
                log::warn!("⚠️  Checkout session not recorded: {}", e);
            }
        }
        "payment_intent.succeeded" => {
            match serde_json::from_value::<PaymentIntent>(event.data.object.clone()) {
                Ok(intent) => log::info!("💰 PaymentIntent succeeded: {} ({})", intent.id, intent.amount),
                Err(_) => log::info!("💰 PaymentIntent succeeded"),
            }
        }
        other => log::info!("Unhandled event type: {}", other),
    }

    HttpResponse::Ok().json(serde_json::json!({ "received": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stripe::webhook::sign;
    use actix_web::{test, App};

    const SECRET: &str = "whsec_handler_test";

    fn app_config(secret: Option<&str>) -> AppConfig {
        let mut config = crate::config::test_config();
        config.stripe.webhook_secret = secret.map(str::to_string);
        config
    }

    async fn test_db() -> MongoDB {
        MongoDB::new("mongodb://localhost:27017/fundrise_webhook_test")
            .await
            .unwrap()
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_bad_signature_is_rejected() {
        let config = app_config(Some(SECRET));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_db().await))
                .app_data(web::Data::new(DocumentStore::new(config.documents_dir.clone())))
                .app_data(web::Data::new(config))
                .route("/api/webhook/stripe", web::post().to(stripe_webhook)),
        )
        .await;

        let body = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let req = test::TestRequest::post()
            .uri("/api/webhook/stripe")
            .insert_header((SIGNATURE_HEADER, "t=1,v1=deadbeef"))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let text = test::read_body(res).await;
        assert!(std::str::from_utf8(&text).unwrap().starts_with("Webhook Error: "));
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_signed_event_is_acknowledged() {
        let config = app_config(Some(SECRET));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_db().await))
                .app_data(web::Data::new(DocumentStore::new(config.documents_dir.clone())))
                .app_data(web::Data::new(config))
                .route("/api/webhook/stripe", web::post().to(stripe_webhook)),
        )
        .await;

        let body = r#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#;
        let header = sign(body.as_bytes(), SECRET, chrono::Utc::now().timestamp());
        let req = test::TestRequest::post()
            .uri("/api/webhook/stripe")
            .insert_header((SIGNATURE_HEADER, header))
            .set_payload(body)
            .to_request();
        let res: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(res["received"], true);
    }

    #[::core::prelude::v1::test]
    fn test_error_body_format() {
        let res = webhook_error(StatusCode::BAD_REQUEST, "Timestamp outside the tolerance zone");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
