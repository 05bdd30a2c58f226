use std::env;
use tracing::warn;

/// Default checkout price for one physiotherapy session, in euro cents.
pub const DEFAULT_SESSION_PRICE_CENTS: i64 = 4000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub site_url: String,
    pub session_price_cents: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .unwrap_or_else(|_| {
                    warn!("STRIPE_SECRET_KEY not set, using empty value");
                    String::new()
                }),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .unwrap_or_else(|_| {
                    warn!("STRIPE_WEBHOOK_SECRET not set, using empty value");
                    String::new()
                }),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| {
                    warn!("STRIPE_API_BASE not set, using default");
                    "https://api.stripe.com".to_string()
                }),
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| {
                    warn!("SITE_URL not set, using default");
                    "http://localhost:3000".to_string()
                }),
            session_price_cents: env::var("SESSION_PRICE_CENTS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_SESSION_PRICE_CENTS),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_payments_configured(&self) -> bool {
        !self.stripe_secret_key.is_empty()
            && !self.stripe_webhook_secret.is_empty()
            && !self.stripe_api_base.is_empty()
    }
}
