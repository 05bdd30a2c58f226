use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Recurring weekly opening hours for one physiotherapist.
/// `weekday` follows the store convention: 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub physio_id: Uuid,
    pub weekday: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub weekday: i32,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQueryParams {
    pub date: NaiveDate,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Day of week must be between 0 (Sunday) and 6 (Saturday)")]
    InvalidWeekday(i32),

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Unsupported session duration: {0} minutes")]
    UnsupportedDuration(i64),

    #[error("Availability window conflicts with an existing schedule")]
    WindowConflict,

    #[error("Availability window not found")]
    WindowNotFound,

    #[error("Physiotherapist not found")]
    PhysioNotFound,

    #[error("Not authorized to manage this physiotherapist")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<crate::services::slots::SlotError> for SchedulingError {
    fn from(err: crate::services::slots::SlotError) -> Self {
        match err {
            crate::services::slots::SlotError::UnsupportedDuration(minutes) => {
                SchedulingError::UnsupportedDuration(minutes)
            }
            crate::services::slots::SlotError::InvalidTime(raw) => {
                SchedulingError::InvalidTime(raw)
            }
        }
    }
}
