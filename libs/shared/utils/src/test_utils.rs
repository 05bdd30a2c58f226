use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub site_url: String,
    pub session_price_cents: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
            stripe_api_base: "http://localhost:12111".to_string(),
            site_url: "http://localhost:3000".to_string(),
            session_price_cents: 4000,
        }
    }
}

impl TestConfig {
    /// Point the Supabase side of the config at a wiremock server.
    pub fn with_supabase_url(mut self, url: &str) -> Self {
        self.supabase_url = url.to_string();
        self
    }

    /// Point the Stripe side of the config at a wiremock server.
    pub fn with_stripe_api_base(mut self, url: &str) -> Self {
        self.stripe_api_base = url.to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            stripe_secret_key: self.stripe_secret_key.clone(),
            stripe_webhook_secret: self.stripe_webhook_secret.clone(),
            stripe_api_base: self.stripe_api_base.clone(),
            site_url: self.site_url.clone(),
            session_price_cents: self.session_price_cents,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn operator(email: &str) -> Self {
        Self::new(email, "clinic_operator")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }
}

pub struct StripeTestUtils;

impl StripeTestUtils {
    /// Sign a webhook payload the way Stripe does: `t=<unix>,v1=<hex hmac>`
    /// over `"{t}.{payload}"`.
    pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signed_payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        let hex: String = signature.iter().map(|b| format!("{:02x}", b)).collect();
        format!("t={},v1={}", timestamp, hex)
    }

    pub fn checkout_completed_event(session_id: &str, metadata: Value, amount_total: i64) -> Value {
        json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": session_id,
                    "object": "checkout.session",
                    "payment_status": "paid",
                    "amount_total": amount_total,
                    "metadata": metadata
                }
            }
        })
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn clinic_response(id: &str, name: &str, allow_presential_payment: bool) -> Value {
        json!({
            "id": id,
            "name": name,
            "location": "Barcelona",
            "allow_presential_payment": allow_presential_payment,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn physio_response(id: &str, clinic_id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "clinic_id": clinic_id,
            "name": name,
            "specialty": "Fisioterapia deportiva",
            "active": true,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn availability_response(id: &str, physio_id: &str, weekday: i32,
                                 start_time: &str, end_time: &str) -> Value {
        json!({
            "id": id,
            "physio_id": physio_id,
            "weekday": weekday,
            "start_time": start_time,
            "end_time": end_time
        })
    }

    pub fn reservation_response(id: &str, clinic_id: &str, physio_id: &str,
                                date: &str, start_time: &str, status: &str) -> Value {
        json!({
            "id": id,
            "clinic_id": clinic_id,
            "physio_id": physio_id,
            "user_id": null,
            "user_name": "Paciente Test",
            "user_email": "paciente@example.com",
            "date": date,
            "start_time": start_time,
            "end_time": null,
            "status": status,
            "payment_status": "presential",
            "price_cents": 4000,
            "checkout_session_id": null,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn profile_response(user_id: &str, role: &str, clinic_id: Option<&str>) -> Value {
        json!({
            "id": user_id,
            "role": role,
            "clinic_id": clinic_id
        })
    }
}
