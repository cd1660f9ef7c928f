use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{hex_id, ProjectRef, UserRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

/// A recorded contribution (collection `payments`).
///
/// `stripe_payment_id` holds either a PaymentIntent id (`pi_…`) or a Checkout
/// Session id (`cs_…`) and is unique across the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub project: ObjectId,
    /// Major currency units
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<ObjectId>,
    pub stripe_payment_id: String,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    pub created_at: i64,
}

impl Payment {
    pub fn completed(
        user: ObjectId,
        project: ObjectId,
        amount: f64,
        reward: Option<ObjectId>,
        stripe_payment_id: &str,
        now: i64,
    ) -> Self {
        Payment {
            id: None,
            user,
            project,
            amount,
            reward,
            stripe_payment_id: stripe_payment_id.to_string(),
            status: PaymentStatus::Completed,
            receipt_url: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub user: UserRef,
    pub project: ProjectRef,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    pub stripe_payment_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    pub created_at: i64,
}

impl PaymentResponse {
    pub fn new(payment: Payment, user: UserRef, project: ProjectRef) -> Self {
        PaymentResponse {
            id: hex_id(&payment.id),
            user,
            project,
            amount: payment.amount,
            reward: payment.reward.map(|r| r.to_hex()),
            stripe_payment_id: payment.stripe_payment_id,
            status: payment.status,
            receipt_url: payment.receipt_url,
            created_at: payment.created_at,
        }
    }
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        let user = UserRef::id(&payment.user);
        let project = ProjectRef::Id(payment.project.to_hex());
        PaymentResponse::new(payment, user, project)
    }
}
