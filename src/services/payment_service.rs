use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    database::MongoDB,
    documents::{DocumentStore, ReceiptData},
    models::{
        hex_id, now_millis, Payment, PaymentResponse, Project, ProjectSummary, ProjectUpdate, User,
        UserSummary,
    },
    services::{
        auth_service::find_user,
        populate::{load_projects, load_users, project_ref, user_ref},
        project_service::find_project,
    },
    stripe::{to_major_units, to_minor_units, PaymentIntent, StripeClient},
    utils::{filename_safe, format_inr, is_duplicate_key, parse_object_id, AppError},
};

pub const ADMIN_PAYMENTS_LIMIT: i64 = 50;
pub const DONATION_UPDATE_TITLE: &str = "New Donation Received";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateIntentRequest {
    pub amount: Option<f64>,
    pub project_id: Option<String>,
    pub reward_id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IntentCreated {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: Option<String>,
    pub project_id: Option<String>,
    pub reward_id: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    AlreadyRecorded(PaymentResponse),
    Recorded {
        payment: PaymentResponse,
        receipt_url: Option<String>,
        receipt_download_url: String,
    },
}

pub struct ReceiptDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Announcement pushed onto a project's timeline for every contribution
pub fn donation_update(donor_name: &str, amount: f64, now: i64) -> ProjectUpdate {
    ProjectUpdate::announcement(
        DONATION_UPDATE_TITLE,
        format!(
            "{} has donated INR {} to this project. Thank you for your support!",
            donor_name,
            format_inr(amount)
        ),
        now,
    )
}

pub fn parse_reward_id(reward_id: Option<&str>) -> Result<Option<ObjectId>, AppError> {
    match reward_id.map(str::trim).filter(|r| !r.is_empty() && *r != "none") {
        Some(id) => parse_object_id(id, "reward").map(Some),
        None => Ok(None),
    }
}

/// The project and reward an intent pays for. The metadata written by
/// `create_intent` wins, and a caller naming a different project is refused.
pub fn intent_target(
    intent: &PaymentIntent,
    project_id: ObjectId,
    reward: Option<ObjectId>,
) -> Result<(ObjectId, Option<ObjectId>), AppError> {
    if let Some(paid_for) = intent.metadata_value("projectId") {
        let paid_for = parse_object_id(paid_for, "project")?;
        if paid_for != project_id {
            log::warn!(
                "⚠️  PaymentIntent {} is for project {}, not {}",
                intent.id,
                paid_for,
                project_id
            );
            return Err(AppError::Validation("Payment does not belong to this project".into()));
        }
    }

    let reward = match intent.metadata_value("rewardId") {
        Some(from_intent) => parse_reward_id(Some(from_intent))?,
        None => reward,
    };
    Ok((project_id, reward))
}

pub async fn find_by_stripe_id(db: &MongoDB, stripe_payment_id: &str) -> Result<Option<Payment>, AppError> {
    Ok(db
        .payments()
        .find_one(doc! { "stripe_payment_id": stripe_payment_id })
        .await?)
}

/// Inserts a payment; `None` when the Stripe id was already recorded
pub async fn insert_payment(db: &MongoDB, mut payment: Payment) -> Result<Option<Payment>, AppError> {
    match db.payments().insert_one(&payment).await {
        Ok(result) => {
            payment.id = result.inserted_id.as_object_id();
            Ok(Some(payment))
        }
        Err(e) if is_duplicate_key(&e) => {
            log::warn!("⚠️  Payment {} already recorded (unique index)", payment.stripe_payment_id);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Adds the contribution to the project totals and timeline in one update
pub async fn credit_project(
    db: &MongoDB,
    project_id: ObjectId,
    amount: f64,
    donor_name: &str,
    reward: Option<ObjectId>,
) -> Result<Project, AppError> {
    let now = now_millis();
    let update = donation_update(donor_name, amount, now);

    let project = db
        .projects()
        .find_one_and_update(
            doc! { "_id": project_id },
            doc! {
                "$inc": { "raised": amount, "backers": 1_i64 },
                "$push": { "updates": to_bson(&update)? },
                "$set": { "updated_at": now },
            },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if let Some(reward) = reward {
        let result = db
            .projects()
            .update_one(
                doc! { "_id": project_id, "rewards._id": reward },
                doc! { "$inc": { "rewards.$.backers": 1_i64 } },
            )
            .await?;
        if result.matched_count == 0 {
            log::warn!("⚠️  Reward {} not found on project {}", reward, project_id);
        }
    }

    log::info!(
        "📊 Project {} credited: raised {} / backers {}",
        project_id,
        project.raised,
        project.backers
    );

    Ok(project)
}

/// Renders and stores the receipt; failures are logged, the payment stands
pub async fn attach_receipt(
    db: &MongoDB,
    store: &DocumentStore,
    payment: &mut Payment,
    backer: &User,
    project: &Project,
) -> Option<String> {
    let payment_id = payment.id?;

    let data = ReceiptData {
        payment_id: payment_id.to_hex(),
        backer_name: backer.name.clone(),
        backer_email: backer.email.clone(),
        project_title: project.title.clone(),
        amount: payment.amount,
        transaction_id: payment.stripe_payment_id.clone(),
        issued_at: Utc::now(),
    };

    let receipt_url = match store.save_receipt(data).await {
        Ok(url) => url,
        Err(e) => {
            log::error!("❌ Receipt generation failed for payment {}: {}", payment_id, e);
            return None;
        }
    };

    if let Err(e) = db
        .payments()
        .update_one(
            doc! { "_id": payment_id },
            doc! { "$set": { "receipt_url": &receipt_url } },
        )
        .await
    {
        log::error!("❌ Failed to store receipt url for payment {}: {}", payment_id, e);
        return None;
    }

    payment.receipt_url = Some(receipt_url.clone());
    Some(receipt_url)
}

pub async fn create_intent(
    db: &MongoDB,
    config: &AppConfig,
    user_id: ObjectId,
    request: &CreateIntentRequest,
) -> Result<IntentCreated, AppError> {
    let stripe = StripeClient::from_settings(&config.stripe)?;

    let (amount, project_id) = match (request.amount, request.project_id.as_deref()) {
        (Some(amount), Some(project_id)) if amount > 0.0 && !project_id.trim().is_empty() => {
            (amount, project_id)
        }
        _ => return Err(AppError::Validation("Amount and project_id are required".into())),
    };
    let project_id = parse_object_id(project_id, "project")?;
    let reward = parse_reward_id(request.reward_id.as_deref())?;

    find_project(db, &project_id).await?;

    let metadata = [
        ("projectId", project_id.to_hex()),
        ("rewardId", reward.map(|r| r.to_hex()).unwrap_or_else(|| "none".into())),
        ("userId", user_id.to_hex()),
    ];
    let intent = stripe
        .create_payment_intent(to_minor_units(amount), &metadata)
        .await?;

    Ok(IntentCreated {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    })
}

pub async fn confirm_payment(
    db: &MongoDB,
    config: &AppConfig,
    store: &DocumentStore,
    user_id: ObjectId,
    request: &ConfirmPaymentRequest,
) -> Result<ConfirmOutcome, AppError> {
    let (intent_id, project_id, amount) = match (
        request.payment_intent_id.as_deref().map(str::trim),
        request.project_id.as_deref().map(str::trim),
        request.amount,
    ) {
        (Some(intent), Some(project), Some(amount))
            if !intent.is_empty() && !project.is_empty() && amount > 0.0 =>
        {
            (intent, project, amount)
        }
        _ => {
            return Err(AppError::Validation(
                "Payment Intent ID, Project ID, and Amount are required".into(),
            ))
        }
    };
    let project_id = parse_object_id(project_id, "project")?;
    let reward = parse_reward_id(request.reward_id.as_deref())?;

    let stripe = StripeClient::from_settings(&config.stripe)?;
    let intent = stripe.retrieve_payment_intent(intent_id).await?;
    if !intent.succeeded() {
        log::warn!("❌ PaymentIntent {} not succeeded: {}", intent.id, intent.status);
        return Err(AppError::Validation("Payment not completed".into()));
    }

    let (project_id, reward) = intent_target(&intent, project_id, reward)?;

    if let Some(existing) = find_by_stripe_id(db, intent_id).await? {
        return Ok(ConfirmOutcome::AlreadyRecorded(PaymentResponse::from(existing)));
    }

    // Stripe's captured amount wins over the client's claim
    let amount = if intent.amount > 0 {
        to_major_units(intent.amount)
    } else {
        amount
    };

    find_project(db, &project_id).await?;
    let backer = find_user(db, &user_id).await?;

    let payment = Payment::completed(user_id, project_id, amount, reward, intent_id, now_millis());
    let Some(mut payment) = insert_payment(db, payment).await? else {
        let existing = find_by_stripe_id(db, intent_id)
            .await?
            .ok_or_else(|| AppError::Internal("Payment vanished after duplicate insert".into()))?;
        return Ok(ConfirmOutcome::AlreadyRecorded(PaymentResponse::from(existing)));
    };
    log::info!("✅ Payment record created: {}", hex_id(&payment.id));

    let project = credit_project(db, project_id, amount, &backer.name, reward).await?;
    let receipt_url = attach_receipt(db, store, &mut payment, &backer, &project).await;
    let receipt_download_url = config.receipt_download_url(&hex_id(&payment.id));

    Ok(ConfirmOutcome::Recorded {
        payment: PaymentResponse::from(payment),
        receipt_url,
        receipt_download_url,
    })
}

/// The caller's payments, newest first, with project title and image
pub async fn my_payments(db: &MongoDB, user_id: ObjectId) -> Result<Vec<PaymentResponse>, AppError> {
    let payments: Vec<Payment> = db
        .payments()
        .find(doc! { "user": user_id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    let projects = load_projects(db, payments.iter().map(|p| p.project)).await?;

    Ok(payments
        .into_iter()
        .map(|payment| {
            let project = project_ref(&projects, &payment.project, ProjectSummary::with_image);
            let user = crate::models::UserRef::id(&payment.user);
            PaymentResponse::new(payment, user, project)
        })
        .collect())
}

pub async fn all_payments(db: &MongoDB) -> Result<Vec<PaymentResponse>, AppError> {
    let payments: Vec<Payment> = db
        .payments()
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .limit(ADMIN_PAYMENTS_LIMIT)
        .await?
        .try_collect()
        .await?;

    let users = load_users(db, payments.iter().map(|p| p.user)).await?;
    let projects = load_projects(db, payments.iter().map(|p| p.project)).await?;

    Ok(payments
        .into_iter()
        .map(|payment| {
            let user = user_ref(&users, &payment.user, UserSummary::contact);
            let project = project_ref(&projects, &payment.project, ProjectSummary::title_only);
            PaymentResponse::new(payment, user, project)
        })
        .collect())
}

pub async fn receipt(db: &MongoDB, store: &DocumentStore, payment_id: &str) -> Result<ReceiptDownload, AppError> {
    let payment_id = parse_object_id(payment_id, "payment")?;
    let payment = db
        .payments()
        .find_one(doc! { "_id": payment_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt not found".into()))?;

    let receipt_url = payment
        .receipt_url
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Receipt not generated yet".into()))?;

    let backer_name = match find_user(db, &payment.user).await {
        Ok(user) => user.name,
        Err(_) => "Backer".to_string(),
    };

    Ok(ReceiptDownload {
        filename: format!("FundRise_Receipt_{}.pdf", filename_safe(&backer_name)),
        bytes: store.read(receipt_url).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpdateKind;

    fn intent_with(metadata: serde_json::Value) -> PaymentIntent {
        serde_json::from_value(serde_json::json!({
            "id": "pi_test_1",
            "status": "succeeded",
            "amount": 50000,
            "metadata": metadata
        }))
        .unwrap()
    }

    #[test]
    fn test_intent_metadata_decides_project_and_reward() {
        let project = ObjectId::new();
        let reward = ObjectId::new();
        let intent = intent_with(serde_json::json!({
            "projectId": project.to_hex(),
            "rewardId": reward.to_hex(),
            "userId": ObjectId::new().to_hex()
        }));

        assert_eq!(intent_target(&intent, project, None).unwrap(), (project, Some(reward)));

        let other = ObjectId::new();
        let err = intent_target(&intent, other, None).unwrap_err();
        assert_eq!(err.to_string(), "Payment does not belong to this project");
    }

    #[test]
    fn test_intent_without_metadata_keeps_caller_ids() {
        let project = ObjectId::new();
        let reward = Some(ObjectId::new());
        let intent = intent_with(serde_json::json!({}));
        assert_eq!(intent_target(&intent, project, reward).unwrap(), (project, reward));

        let no_reward = intent_with(serde_json::json!({ "projectId": project.to_hex(), "rewardId": "none" }));
        assert_eq!(intent_target(&no_reward, project, reward).unwrap(), (project, None));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_unique_index_absorbs_duplicate_insert() {
        dotenv::dotenv().ok();
        let config = crate::config::test_config();
        let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| config.mongodb_uri.clone());
        let db = MongoDB::new(&uri).await.unwrap();

        let stripe_id = format!("pi_test_{}", ObjectId::new());
        let payment = || {
            Payment::completed(ObjectId::new(), ObjectId::new(), 250.0, None, &stripe_id, now_millis())
        };

        let first = insert_payment(&db, payment()).await.unwrap();
        assert!(first.and_then(|p| p.id).is_some());

        let second = insert_payment(&db, payment()).await.unwrap();
        assert!(second.is_none());

        let count = db
            .payments()
            .count_documents(doc! { "stripe_payment_id": &stripe_id })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_donation_update_message() {
        let update = donation_update("Rohan Das", 150000.0, 7);
        assert_eq!(update.title, "New Donation Received");
        assert_eq!(update.kind, UpdateKind::Announcement);
        assert_eq!(
            update.content,
            "Rohan Das has donated INR 1,50,000 to this project. Thank you for your support!"
        );
        assert_eq!(update.created_at, 7);
    }

    #[test]
    fn test_reward_id_parsing() {
        assert_eq!(parse_reward_id(None).unwrap(), None);
        assert_eq!(parse_reward_id(Some("none")).unwrap(), None);
        assert_eq!(parse_reward_id(Some("  ")).unwrap(), None);

        let id = ObjectId::new();
        assert_eq!(parse_reward_id(Some(&id.to_hex())).unwrap(), Some(id));
        assert_eq!(
            parse_reward_id(Some("bogus")).unwrap_err().to_string(),
            "Invalid reward ID"
        );
    }

    #[test]
    fn test_unconfigured_stripe_is_server_error() {
        use actix_web::ResponseError;

        let config = crate::config::test_config();
        let err = StripeClient::from_settings(&config.stripe).err().unwrap();
        assert_eq!(err.status_code(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
