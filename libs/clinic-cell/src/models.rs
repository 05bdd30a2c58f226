use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// CORE CLINIC MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    /// Clinics with this flag collect payment in person; bookings for them
    /// skip the online checkout entirely.
    pub allow_presential_payment: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Physiotherapist {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub specialty: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ClinicSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateClinicRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub allow_presential_payment: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePhysioRequest {
    pub name: String,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePhysioRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub active: Option<bool>,
}

// ==============================================================================
// STATS MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsRange {
    Week,
    Month,
    Quarter,
    All,
}

impl Default for StatsRange {
    fn default() -> Self {
        StatsRange::Month
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub range: Option<StatsRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicStats {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub cancelled: usize,
    pub completed: usize,
    /// Σ price of accepted and completed reservations, in cents.
    pub revenue_cents: i64,
    pub daily_revenue: Vec<DailyRevenue>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Physiotherapist not found")]
    PhysioNotFound,

    #[error("Operator profile has no clinic")]
    OperatorWithoutClinic,

    #[error("Not authorized to manage this clinic")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Database(String),
}
