use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Converts major units (rupees) to the minor units Stripe bills in (paise)
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn to_major_units(amount: i64) -> f64 {
    amount as f64 / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    /// A metadata value set when the intent was created
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    pub fn amount_major(&self) -> f64 {
        to_major_units(self.amount_total.unwrap_or(0))
    }

    /// Email entered at checkout, falling back to the prefilled one
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
            .filter(|e| !e.trim().is_empty())
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }

    /// The reward picked on the project page, if any
    pub fn reward_id(&self) -> Option<&str> {
        self.metadata
            .get("rewardId")
            .map(String::as_str)
            .filter(|r| !r.is_empty() && *r != "none")
    }
}

/// What the checkout page needs to build a session
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub product_name: String,
    pub product_description: String,
    pub image: Option<String>,
    pub unit_amount: i64,
    pub success_url: String,
    pub cancel_url: String,
    pub client_reference_id: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Deserialize)]
pub struct StripeApiError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_unit_conversion() {
        assert_eq!(to_minor_units(499.99), 49999);
        assert_eq!(to_minor_units(0.1 + 0.2), 30);
        assert_eq!(to_major_units(150050), 1500.5);
    }

    #[test]
    fn test_session_accessors() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_123",
            "payment_status": "paid",
            "amount_total": 250000,
            "client_reference_id": "65f1a2b3c4d5e6f708192a3b",
            "customer_details": { "email": "donor@example.com", "name": null },
            "metadata": { "rewardId": "none", "projectId": "65f1a2b3c4d5e6f708192a3b" }
        }))
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.amount_major(), 2500.0);
        assert_eq!(session.customer_email(), Some("donor@example.com"));
        assert_eq!(session.customer_name(), None);
        assert_eq!(session.reward_id(), None);
    }
}
