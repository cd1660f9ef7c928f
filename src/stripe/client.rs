use serde::de::DeserializeOwned;

use super::types::{CheckoutSession, CheckoutSessionParams, PaymentIntent, StripeErrorBody};
use crate::config::StripeSettings;
use crate::utils::AppError;

pub const NOT_CONFIGURED: &str = "Payment system is not configured. Please contact administrator.";

/// Thin client over the Stripe REST API (form-encoded requests, JSON responses)
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
    currency: String,
}

impl StripeClient {
    pub fn from_settings(settings: &StripeSettings) -> Result<Self, AppError> {
        let secret_key = settings
            .secret_key
            .clone()
            .ok_or_else(|| AppError::Stripe(NOT_CONFIGURED.into()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            secret_key,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            currency: settings.currency.clone(),
        })
    }

    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        metadata: &[(&str, String)],
    ) -> Result<PaymentIntent, AppError> {
        let mut form = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), self.currency.clone()),
        ];
        form.extend(
            metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value.clone())),
        );

        log::info!("💳 Creating Stripe PaymentIntent: {} {}", amount_minor, self.currency);
        self.post("/v1/payment_intents", &form).await
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        self.get(&format!("/v1/payment_intents/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, AppError> {
        let item = "line_items[0]";
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (format!("{}[quantity]", item), "1".to_string()),
            (format!("{}[price_data][currency]", item), self.currency.clone()),
            (
                format!("{}[price_data][unit_amount]", item),
                params.unit_amount.to_string(),
            ),
            (
                format!("{}[price_data][product_data][name]", item),
                params.product_name.clone(),
            ),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
            (
                "client_reference_id".to_string(),
                params.client_reference_id.clone(),
            ),
        ];
        if !params.product_description.trim().is_empty() {
            form.push((
                format!("{}[price_data][product_data][description]", item),
                params.product_description.clone(),
            ));
        }
        if let Some(image) = params.image.as_ref().filter(|i| !i.is_empty()) {
            form.push((
                format!("{}[price_data][product_data][images][0]", item),
                image.clone(),
            ));
        }
        form.extend(
            params
                .metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value.clone())),
        );

        log::info!("🛒 Creating Stripe Checkout Session for {}", params.client_reference_id);
        self.post("/v1/checkout/sessions", &form).await
    }

    pub async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, AppError> {
        self.get(&format!("/v1/checkout/sessions/{}", urlencoding::encode(id)))
            .await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Failed to reach Stripe: {}", e)))?;

        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Failed to reach Stripe: {}", e)))?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Stripe(format!("Failed to read Stripe response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("Stripe API error: {}", status));
            log::warn!("⚠️  Stripe returned {}: {}", status, message);
            return Err(AppError::Stripe(message));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Stripe(format!("Unexpected Stripe response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_not_configured() {
        let settings = StripeSettings {
            secret_key: None,
            webhook_secret: None,
            api_base: "https://api.stripe.com".into(),
            currency: "inr".into(),
        };
        let err = StripeClient::from_settings(&settings).err().unwrap();
        assert_eq!(err.to_string(), NOT_CONFIGURED);
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let settings = StripeSettings {
            secret_key: Some("sk_test_x".into()),
            webhook_secret: None,
            api_base: "http://localhost:12111/".into(),
            currency: "inr".into(),
        };
        let client = StripeClient::from_settings(&settings).unwrap();
        assert_eq!(client.api_base, "http://localhost:12111");
        assert_eq!(client.currency, "inr");
    }
}
