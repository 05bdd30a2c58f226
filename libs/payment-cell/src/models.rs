// libs/payment-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use booking_cell::models::{NewReservation, PaymentStatus, Reservation, ReservationStatus};
use scheduling_cell::services::slots::{parse_time, slot_end, SLOT_INCREMENT_MINUTES};

// ==============================================================================
// CHECKOUT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub clinic_id: Uuid,
    pub physio_id: Uuid,
    pub user_name: String,
    pub user_email: Option<String>,
    pub date: NaiveDate,
    /// Wall-clock start, "16:30" as sent by the booking form.
    pub time: String,
    pub duration_minutes: Option<i64>,
}

/// What the submission produced: a persisted presential reservation, or a
/// hosted checkout the client must be redirected to.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    Presential { reservation: Reservation },
    OnlinePayment { url: String },
}

// ==============================================================================
// STRIPE WIRE MODELS
// ==============================================================================

/// Subset of a Stripe Checkout Session this application reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// Reservation fields carried through the checkout as opaque session
/// metadata. Stripe stores metadata values as strings, so everything is kept
/// stringly here and parsed back when the webhook confirms payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub clinic_id: String,
    pub physio_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub date: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<String>,
}

impl SessionMetadata {
    /// Flatten into `metadata[...]` form fields for the session-create call.
    pub fn to_form_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            ("metadata[clinic_id]".to_string(), self.clinic_id.clone()),
            ("metadata[physio_id]".to_string(), self.physio_id.clone()),
            ("metadata[user_name]".to_string(), self.user_name.clone()),
            ("metadata[date]".to_string(), self.date.clone()),
            ("metadata[time]".to_string(), self.time.clone()),
        ];
        if let Some(user_id) = &self.user_id {
            entries.push(("metadata[user_id]".to_string(), user_id.clone()));
        }
        if let Some(user_email) = &self.user_email {
            entries.push(("metadata[user_email]".to_string(), user_email.clone()));
        }
        if let Some(duration) = &self.duration_minutes {
            entries.push(("metadata[duration_minutes]".to_string(), duration.clone()));
        }
        if let Some(price) = &self.price_cents {
            entries.push(("metadata[price_cents]".to_string(), price.clone()));
        }
        entries
    }

    /// Rebuild the reservation the patient paid for. Called from the webhook
    /// once the session completed.
    pub fn to_new_reservation(
        &self,
        session_id: &str,
        amount_total: Option<i64>,
    ) -> Result<NewReservation, PaymentError> {
        let clinic_id = Uuid::parse_str(&self.clinic_id)
            .map_err(|_| PaymentError::InvalidMetadata("clinic_id".to_string()))?;
        let physio_id = Uuid::parse_str(&self.physio_id)
            .map_err(|_| PaymentError::InvalidMetadata("physio_id".to_string()))?;
        let user_id = match &self.user_id {
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| PaymentError::InvalidMetadata("user_id".to_string()))?,
            ),
            None => None,
        };
        let date: NaiveDate = self
            .date
            .parse()
            .map_err(|_| PaymentError::InvalidMetadata("date".to_string()))?;
        let start_time = parse_time(&self.time)
            .map_err(|_| PaymentError::InvalidMetadata("time".to_string()))?;

        let duration_minutes = match &self.duration_minutes {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| PaymentError::InvalidMetadata("duration_minutes".to_string()))?,
            None => SLOT_INCREMENT_MINUTES,
        };

        let price_cents = amount_total
            .or_else(|| self.price_cents.as_ref().and_then(|raw| raw.parse().ok()));

        Ok(NewReservation {
            clinic_id,
            physio_id,
            user_id,
            user_name: self.user_name.clone(),
            user_email: self.user_email.clone(),
            date,
            start_time,
            end_time: Some(slot_end(start_time, duration_minutes)),
            status: ReservationStatus::Accepted,
            payment_status: PaymentStatus::Paid,
            price_cents,
            checkout_session_id: Some(session_id.to_string()),
        })
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported session duration: {0} minutes")]
    UnsupportedDuration(i64),

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Time slot is no longer available")]
    SlotNotAvailable,

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("Invalid session metadata: {0}")]
    InvalidMetadata(String),

    #[error("Payment provider error: {0}")]
    Stripe(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<scheduling_cell::models::SchedulingError> for PaymentError {
    fn from(err: scheduling_cell::models::SchedulingError) -> Self {
        use scheduling_cell::models::SchedulingError;
        match err {
            SchedulingError::UnsupportedDuration(minutes) => {
                PaymentError::UnsupportedDuration(minutes)
            }
            SchedulingError::InvalidTime(raw) => PaymentError::InvalidTime(raw),
            other => PaymentError::Database(other.to_string()),
        }
    }
}

impl From<booking_cell::models::ReservationError> for PaymentError {
    fn from(err: booking_cell::models::ReservationError) -> Self {
        use booking_cell::models::ReservationError;
        match err {
            ReservationError::SlotNotAvailable => PaymentError::SlotNotAvailable,
            other => PaymentError::Database(other.to_string()),
        }
    }
}

impl From<clinic_cell::models::ClinicError> for PaymentError {
    fn from(err: clinic_cell::models::ClinicError) -> Self {
        use clinic_cell::models::ClinicError;
        match err {
            ClinicError::ClinicNotFound => PaymentError::ClinicNotFound,
            other => PaymentError::Database(other.to_string()),
        }
    }
}
