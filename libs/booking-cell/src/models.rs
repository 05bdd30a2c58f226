// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// CORE RESERVATION MODELS
// ==============================================================================

/// Canonical reservation lifecycle. The legacy store mixed Spanish and English
/// values; English snake_case is canonical and the Spanish forms remain
/// accepted as input aliases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[serde(alias = "pendiente")]
    Pending,

    #[serde(alias = "aceptada", alias = "confirmed")]
    Accepted,

    #[serde(alias = "cancelada")]
    Cancelled,

    #[serde(alias = "completada")]
    Completed,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::Accepted => write!(f, "accepted"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
            ReservationStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// To be paid in person at the clinic.
    #[serde(alias = "presencial")]
    Presential,

    #[serde(alias = "pagado")]
    Paid,

    Unpaid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Presential => write!(f, "presential"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Unpaid => write!(f, "unpaid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub physio_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_name: String,
    pub user_email: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub price_cents: Option<i64>,
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Scheduled start as a naive timestamp, for past/future comparisons.
    pub fn starts_at(&self) -> chrono::NaiveDateTime {
        self.date.and_time(self.start_time)
    }
}

/// Insert payload for a new reservation row.
#[derive(Debug, Clone, Serialize)]
pub struct NewReservation {
    pub clinic_id: Uuid,
    pub physio_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_name: String,
    pub user_email: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub price_cents: Option<i64>,
    pub checkout_session_id: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSummary {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysioSummary {
    pub id: Uuid,
    pub name: String,
    pub clinic_id: Uuid,
}

/// A reservation joined in application code with its clinic and physio, the
/// shape the patient booking list renders.
#[derive(Debug, Clone, Serialize)]
pub struct BookingWithDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub clinic: Option<ClinicSummary>,
    pub physio: Option<PhysioSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ClinicBookingsQuery {
    pub status: Option<ReservationStatus>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum ReservationError {
    #[error("Reservation not found")]
    NotFound,

    #[error("Time slot is no longer available")]
    SlotNotAvailable,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Reservation cannot be modified in current status: {0}")]
    InvalidStatusTransition(ReservationStatus),

    #[error("Not authorized to modify this reservation")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),
}
