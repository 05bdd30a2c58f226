// libs/payment-cell/src/services/stripe.rs
use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{CheckoutSession, PaymentError, SessionMetadata};

/// Stripe REST client. Only the two calls the booking flow needs: creating a
/// hosted Checkout Session and fetching one back by id. Stripe speaks
/// form-encoded requests, not JSON.
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

pub struct CreateCheckoutSessionParams {
    pub product_name: String,
    pub description: String,
    pub unit_amount_cents: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: SessionMetadata,
}

impl StripeClient {
    pub fn new(config: &AppConfig) -> Result<Self, PaymentError> {
        if !config.is_payments_configured() {
            return Err(PaymentError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            secret_key: config.stripe_secret_key.clone(),
            base_url: config.stripe_api_base.clone(),
        })
    }

    /// POST /v1/checkout/sessions
    pub async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        info!("Creating Stripe checkout session for {}", params.description);

        let url = format!("{}/v1/checkout/sessions", self.base_url);

        let mut form: Vec<(String, String)> = vec![
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("mode".to_string(), "payment".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                params.currency.clone(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                params.product_name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]".to_string(),
                params.description.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                params.unit_amount_cents.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
        ];
        form.extend(params.metadata.to_form_entries());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe session creation failed: {} - {}", status, response_text);
            return Err(PaymentError::Stripe(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        let session: CheckoutSession = serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::Stripe(format!("Failed to parse session response: {}", e)))?;

        info!("Created Stripe checkout session {}", session.id);
        Ok(session)
    }

    /// GET /v1/checkout/sessions/{id}
    pub async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        debug!("Fetching Stripe checkout session {}", session_id);

        let url = format!("{}/v1/checkout/sessions/{}", self.base_url, session_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe session fetch failed: {} - {}", status, response_text);
            return Err(PaymentError::Stripe(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        serde_json::from_str(&response_text)
            .map_err(|e| PaymentError::Stripe(format!("Failed to parse session response: {}", e)))
    }
}
