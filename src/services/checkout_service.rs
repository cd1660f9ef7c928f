use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    database::MongoDB,
    documents::DocumentStore,
    models::{hex_id, now_millis, Payment, Role, User},
    services::{
        auth_service::{hash_password, normalize_email},
        payment_service::{
            attach_receipt, credit_project, find_by_stripe_id, insert_payment, parse_reward_id,
        },
        project_service::find_project,
    },
    stripe::{to_minor_units, CheckoutSession, CheckoutSessionParams, StripeClient},
    utils::{is_duplicate_key, parse_object_id, AppError},
};

pub const GUEST_NAME: &str = "Anonymous Donor";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateSessionRequest {
    pub project_id: Option<String>,
    pub amount: Option<f64>,
    pub reward_id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionCreated {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionSummary {
    pub id: String,
    pub status: String,
    pub customer_email: Option<String>,
    pub amount_total: f64,
    pub project_id: Option<String>,
}

impl From<&CheckoutSession> for SessionSummary {
    fn from(session: &CheckoutSession) -> Self {
        SessionSummary {
            id: session.id.clone(),
            status: session.payment_status.clone(),
            customer_email: session.customer_email().map(str::to_string),
            amount_total: session.amount_major(),
            project_id: session.client_reference_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ConfirmSessionRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RecordedDonation {
    pub payment_id: String,
    pub project_id: String,
    pub new_raised_amount: f64,
    pub new_backers_count: i64,
}

#[derive(Debug)]
pub enum CheckoutOutcome {
    AlreadyProcessed,
    Recorded(RecordedDonation),
}

pub fn success_url(frontend_url: &str) -> String {
    format!(
        "{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}",
        frontend_url.trim_end_matches('/')
    )
}

pub fn cancel_url(frontend_url: &str, project_id: &str) -> String {
    format!("{}/project/{}", frontend_url.trim_end_matches('/'), project_id)
}

/// A throwaway password for accounts created from a checkout email
fn guest_password() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

pub async fn create_session(
    db: &MongoDB,
    config: &AppConfig,
    user_id: ObjectId,
    request: &CreateSessionRequest,
) -> Result<SessionCreated, AppError> {
    let (project_id, amount) = match (request.project_id.as_deref(), request.amount) {
        (Some(project_id), Some(amount)) if !project_id.trim().is_empty() && amount > 0.0 => {
            (project_id, amount)
        }
        _ => return Err(AppError::Validation("Project ID and amount are required".into())),
    };
    let project_id = parse_object_id(project_id, "project")?;
    let reward = parse_reward_id(request.reward_id.as_deref())?;

    let project = find_project(db, &project_id).await?;
    let stripe = StripeClient::from_settings(&config.stripe)?;

    let project_hex = project_id.to_hex();
    let params = CheckoutSessionParams {
        product_name: format!("Donation to: {}", project.title),
        product_description: project.description.clone(),
        image: Some(project.image.clone()),
        unit_amount: to_minor_units(amount),
        success_url: success_url(&config.frontend_url),
        cancel_url: cancel_url(&config.frontend_url, &project_hex),
        client_reference_id: project_hex.clone(),
        metadata: vec![
            ("projectId".into(), project_hex),
            (
                "rewardId".into(),
                reward.map(|r| r.to_hex()).unwrap_or_else(|| "none".into()),
            ),
            ("userId".into(), user_id.to_hex()),
        ],
    };

    let session = stripe.create_checkout_session(&params).await?;
    log::info!("✅ Checkout session created: {}", session.id);

    Ok(SessionCreated {
        session_id: session.id,
        url: session.url,
    })
}

pub async fn session_details(config: &AppConfig, session_id: &str) -> Result<SessionSummary, AppError> {
    let stripe = StripeClient::from_settings(&config.stripe)?;
    let session = stripe.retrieve_checkout_session(session_id).await?;
    Ok(SessionSummary::from(&session))
}

/// Called by the success page once Stripe redirects back
pub async fn confirm_payment(
    db: &MongoDB,
    config: &AppConfig,
    store: &DocumentStore,
    request: &ConfirmSessionRequest,
) -> Result<CheckoutOutcome, AppError> {
    let session_id = request
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Session ID is required".into()))?;

    let stripe = StripeClient::from_settings(&config.stripe)?;
    let session = stripe.retrieve_checkout_session(session_id).await?;

    log::info!(
        "📊 Session {} retrieved: payment_status={}, project={:?}",
        session.id,
        session.payment_status,
        session.client_reference_id
    );

    if !session.is_paid() {
        return Err(AppError::Validation("Payment not completed".into()));
    }

    record_checkout_session(db, store, &session).await
}

async fn find_or_create_donor(db: &MongoDB, email: &str, name: Option<&str>) -> Result<User, AppError> {
    let email = normalize_email(email);
    if let Some(user) = db.users().find_one(doc! { "email": &email }).await? {
        return Ok(user);
    }

    let now = now_millis();
    let mut user = User {
        id: None,
        name: name.unwrap_or(GUEST_NAME).to_string(),
        email: email.clone(),
        password: hash_password(&guest_password())?,
        role: Role::User,
        avatar: None,
        created_at: now,
        updated_at: now,
    };

    match db.users().insert_one(&user).await {
        Ok(result) => {
            user.id = result.inserted_id.as_object_id();
            log::info!("✅ Created guest user: {}", hex_id(&user.id));
            Ok(user)
        }
        // Created concurrently by the webhook or the success page
        Err(e) if is_duplicate_key(&e) => db
            .users()
            .find_one(doc! { "email": &email })
            .await?
            .ok_or_else(|| AppError::Internal("Donor account vanished after duplicate insert".into())),
        Err(e) => Err(e.into()),
    }
}

/// Records a paid session exactly once; shared by the success page and the webhook
pub async fn record_checkout_session(
    db: &MongoDB,
    store: &DocumentStore,
    session: &CheckoutSession,
) -> Result<CheckoutOutcome, AppError> {
    let project_id = session
        .client_reference_id
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No project ID found in session".into()))?;
    let project_id = parse_object_id(project_id, "project")?;

    if find_by_stripe_id(db, &session.id).await?.is_some() {
        log::info!("⚠️  Session {} already processed", session.id);
        return Ok(CheckoutOutcome::AlreadyProcessed);
    }

    let email = session
        .customer_email()
        .ok_or_else(|| AppError::Validation("No customer email found in session".into()))?;

    find_project(db, &project_id).await?;
    let donor = find_or_create_donor(db, email, session.customer_name()).await?;
    let donor_id = donor
        .id
        .ok_or_else(|| AppError::Internal("Donor has no id".into()))?;

    let amount = session.amount_major();
    let reward = parse_reward_id(session.reward_id()).unwrap_or(None);

    let payment = Payment::completed(donor_id, project_id, amount, reward, &session.id, now_millis());
    let Some(mut payment) = insert_payment(db, payment).await? else {
        return Ok(CheckoutOutcome::AlreadyProcessed);
    };
    log::info!("✅ Payment record created: {}", hex_id(&payment.id));

    let project = credit_project(db, project_id, amount, &donor.name, reward).await?;
    attach_receipt(db, store, &mut payment, &donor, &project).await;

    log::info!("🎉 Checkout session {} recorded", session.id);

    Ok(CheckoutOutcome::Recorded(RecordedDonation {
        payment_id: hex_id(&payment.id),
        project_id: project_id.to_hex(),
        new_raised_amount: project.raised,
        new_backers_count: project.backers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_urls() {
        assert_eq!(
            success_url("http://localhost:5173/"),
            "http://localhost:5173/payment/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            cancel_url("https://fundrise.app", "abc"),
            "https://fundrise.app/project/abc"
        );
    }

    #[test]
    fn test_guest_password_is_random() {
        let a = guest_password();
        let b = guest_password();
        assert_ne!(a, b);
        assert_eq!(a.len(), 22);
    }

    #[test]
    fn test_session_summary_uses_major_units() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_9",
            "payment_status": "unpaid",
            "amount_total": 99950,
            "customer_email": "guest@example.com"
        }))
        .unwrap();

        let summary = SessionSummary::from(&session);
        assert_eq!(summary.status, "unpaid");
        assert_eq!(summary.amount_total, 999.5);
        assert_eq!(summary.customer_email.as_deref(), Some("guest@example.com"));
        assert!(summary.project_id.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_recording_a_session_twice_is_idempotent() {
        dotenv::dotenv().ok();
        let config = crate::config::test_config();
        let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| config.mongodb_uri.clone());
        let db = MongoDB::new(&uri).await.unwrap();
        let store = DocumentStore::new(config.documents_dir.clone());

        let input = crate::models::CampaignInput {
            title: "Idempotency".into(),
            description: "Test".into(),
            long_description: None,
            category: "Test".into(),
            image: "https://img/x.png".into(),
            goal: 1000.0,
            days_left: 10,
            featured: false,
            rewards: vec![],
        };
        let project = input.into_project(ObjectId::new(), now_millis()).unwrap();
        let project_id = db
            .projects()
            .insert_one(&project)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap();

        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": format!("cs_test_{}", ObjectId::new()),
            "payment_status": "paid",
            "amount_total": 50000,
            "client_reference_id": project_id.to_hex(),
            "customer_details": { "email": format!("donor-{}@example.com", ObjectId::new()) }
        }))
        .unwrap();

        let first = record_checkout_session(&db, &store, &session).await.unwrap();
        let second = record_checkout_session(&db, &store, &session).await.unwrap();

        match first {
            CheckoutOutcome::Recorded(donation) => {
                assert_eq!(donation.new_raised_amount, 500.0);
                assert_eq!(donation.new_backers_count, 1);
            }
            CheckoutOutcome::AlreadyProcessed => panic!("first delivery must record"),
        }
        assert!(matches!(second, CheckoutOutcome::AlreadyProcessed));

        let count = db
            .payments()
            .count_documents(doc! { "stripe_payment_id": &session.id })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
