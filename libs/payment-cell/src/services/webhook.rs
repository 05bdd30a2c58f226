// libs/payment-cell/src/services/webhook.rs
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, warn};

use booking_cell::services::reservation::{ConflictTarget, ReservationService};
use shared_config::AppConfig;

use crate::models::{CheckoutSession, PaymentError, SessionMetadata, StripeEvent};

type HmacSha256 = Hmac<Sha256>;

/// Events older than this are rejected even with a valid signature.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>`) against the raw
/// request body: HMAC-SHA256 over `"{t}.{payload}"` keyed with the shared
/// signing secret. Any failure is fatal to the request.
pub fn verify_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), PaymentError> {
    if secret.is_empty() {
        return Err(PaymentError::NotConfigured);
    }

    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", raw)) => timestamp = raw.parse().ok(),
            Some(("v1", raw)) => candidates.push(raw),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::SignatureVerification("missing timestamp".to_string())
    })?;
    if candidates.is_empty() {
        return Err(PaymentError::SignatureVerification(
            "missing v1 signature".to_string(),
        ));
    }

    let age = now.timestamp() - timestamp;
    if age.abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::SignatureVerification(format!(
            "timestamp outside tolerance ({}s old)",
            age
        )));
    }

    let signed_payload = format!("{}.{}", timestamp, payload);

    for candidate in candidates {
        let decoded = match decode_hex(candidate) {
            Some(bytes) => bytes,
            None => continue,
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| PaymentError::SignatureVerification("bad signing secret".to_string()))?;
        mac.update(signed_payload.as_bytes());

        if mac.verify_slice(&decoded).is_ok() {
            return Ok(());
        }
    }

    Err(PaymentError::SignatureVerification(
        "no matching v1 signature".to_string(),
    ))
}

fn decode_hex(raw: &str) -> Option<Vec<u8>> {
    if raw.len() % 2 != 0 {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&raw[i..i + 2], 16).ok())
        .collect()
}

#[derive(Debug)]
pub enum WebhookOutcome {
    /// A new reservation was written for the completed session.
    Recorded,
    /// The session id was already recorded; replayed delivery, nothing done.
    AlreadyRecorded,
    /// Event type this application does not care about.
    Ignored,
}

pub struct WebhookService {
    reservations: ReservationService,
}

impl WebhookService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            reservations: ReservationService::new(config),
        }
    }

    /// Persist the reservation for a completed checkout session. Deduplicated
    /// by session id so redelivered events cannot double-book.
    pub async fn handle_event(
        &self,
        event: StripeEvent,
        auth_token: &str,
    ) -> Result<WebhookOutcome, PaymentError> {
        if event.event_type != "checkout.session.completed" {
            debug!("Ignoring webhook event type {}", event.event_type);
            return Ok(WebhookOutcome::Ignored);
        }

        let session: CheckoutSession = serde_json::from_value(event.data.object)
            .map_err(|e| PaymentError::InvalidMetadata(e.to_string()))?;

        let metadata_value = session
            .metadata
            .clone()
            .ok_or_else(|| PaymentError::InvalidMetadata("session has no metadata".to_string()))?;
        let metadata: SessionMetadata = serde_json::from_value(metadata_value)
            .map_err(|e| PaymentError::InvalidMetadata(e.to_string()))?;

        if let Some(existing) = self
            .reservations
            .find_by_checkout_session(&session.id, auth_token)
            .await?
        {
            warn!(
                "Webhook replay for session {}: reservation {} already recorded",
                session.id, existing.id
            );
            return Ok(WebhookOutcome::AlreadyRecorded);
        }

        let new = metadata.to_new_reservation(&session.id, session.amount_total)?;

        match self
            .reservations
            .insert_reservation(&new, ConflictTarget::CheckoutSession, auth_token)
            .await?
        {
            Some(reservation) => {
                info!(
                    "Reservation {} recorded for completed session {} ({} {})",
                    reservation.id, session.id, reservation.date, reservation.start_time
                );
                Ok(WebhookOutcome::Recorded)
            }
            // The lookup and the insert can still race a concurrent delivery;
            // the unique session id column makes the second insert a no-op.
            None => Ok(WebhookOutcome::AlreadyRecorded),
        }
    }
}
