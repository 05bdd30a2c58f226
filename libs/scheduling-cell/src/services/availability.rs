use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AvailabilityWindow, AvailableSlot, CreateAvailabilityRequest, SchedulingError,
};
use crate::services::slots::{
    available_starts, occupied_increments, parse_time, slot_end, SLOT_INCREMENT_MINUTES,
};

pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Create a recurring availability window for a physiotherapist.
    pub async fn create_availability(
        &self,
        physio_id: Uuid,
        request: CreateAvailabilityRequest,
        auth_token: &str,
    ) -> Result<AvailabilityWindow, SchedulingError> {
        debug!("Creating availability window for physio: {}", physio_id);

        if !(0..=6).contains(&request.weekday) {
            return Err(SchedulingError::InvalidWeekday(request.weekday));
        }

        let start_time = parse_time(&request.start_time)?;
        let end_time = parse_time(&request.end_time)?;

        if start_time >= end_time {
            return Err(SchedulingError::InvalidTimeRange);
        }

        self.check_window_conflicts(physio_id, request.weekday, start_time, end_time, auth_token)
            .await?;

        let window_data = json!({
            "physio_id": physio_id,
            "weekday": request.weekday,
            "start_time": start_time.format("%H:%M:%S").to_string(),
            "end_time": end_time.format("%H:%M:%S").to_string(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/availability",
                Some(auth_token),
                Some(window_data),
                Some(headers),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Failed to create availability".to_string()))?;

        let window: AvailabilityWindow =
            serde_json::from_value(row).map_err(|e| SchedulingError::Database(e.to_string()))?;
        debug!("Availability window created with ID: {}", window.id);

        Ok(window)
    }

    /// All windows for a physiotherapist, ordered by weekday then start time.
    pub async fn get_physio_availability(
        &self,
        physio_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        let path = format!(
            "/rest/v1/availability?physio_id=eq.{}&order=weekday.asc,start_time.asc",
            physio_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row))
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    pub async fn get_window(
        &self,
        window_id: Uuid,
        auth_token: &str,
    ) -> Result<AvailabilityWindow, SchedulingError> {
        let path = format!("/rest/v1/availability?id=eq.{}", window_id);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(SchedulingError::WindowNotFound)?;
        serde_json::from_value(row).map_err(|e| SchedulingError::Database(e.to_string()))
    }

    pub async fn delete_availability(
        &self,
        window_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!("Deleting availability window: {}", window_id);

        let path = format!("/rest/v1/availability?id=eq.{}", window_id);
        self.supabase
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    /// Clinic a physiotherapist belongs to; used by operator-side ownership checks.
    pub async fn get_physio_clinic(
        &self,
        physio_id: Uuid,
        auth_token: &str,
    ) -> Result<Uuid, SchedulingError> {
        let path = format!(
            "/rest/v1/physiotherapists?id=eq.{}&select=id,clinic_id",
            physio_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(SchedulingError::PhysioNotFound)?;

        row["clinic_id"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| SchedulingError::Database("physio row without clinic_id".to_string()))
    }

    /// Bookable start times for a physiotherapist on a calendar date: the
    /// weekday's windows minus the increments of every non-cancelled
    /// reservation, for the requested session duration.
    pub async fn get_available_slots(
        &self,
        physio_id: Uuid,
        date: NaiveDate,
        duration_minutes: Option<i64>,
        auth_token: &str,
    ) -> Result<Vec<AvailableSlot>, SchedulingError> {
        let duration = duration_minutes.unwrap_or(SLOT_INCREMENT_MINUTES);
        debug!(
            "Calculating available slots for physio {} on {} ({} min)",
            physio_id, date, duration
        );

        let weekday = weekday_index(date);
        let windows = self
            .get_availability_for_day(physio_id, weekday, auth_token)
            .await?;

        if windows.is_empty() {
            debug!("No availability configured for weekday {}", weekday);
            return Ok(vec![]);
        }

        let booked = self.get_booked_increments(physio_id, date, auth_token).await?;

        let mut slots: Vec<AvailableSlot> = Vec::new();
        for window in &windows {
            let starts = available_starts(window.start_time, window.end_time, &booked, duration)?;
            slots.extend(starts.into_iter().map(|start_time| AvailableSlot {
                start_time,
                end_time: slot_end(start_time, duration),
                duration_minutes: duration,
            }));
        }

        slots.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        slots.dedup_by(|a, b| a.start_time == b.start_time);

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }

    /// True when `start_time` is a currently bookable start for the date.
    pub async fn is_slot_available(
        &self,
        physio_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: i64,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let slots = self
            .get_available_slots(physio_id, date, Some(duration_minutes), auth_token)
            .await?;

        Ok(slots.iter().any(|slot| slot.start_time == start_time))
    }

    // Private helper methods

    async fn check_window_conflicts(
        &self,
        physio_id: Uuid,
        weekday: i32,
        start_time: NaiveTime,
        end_time: NaiveTime,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/availability?physio_id=eq.{}&weekday=eq.{}",
            physio_id, weekday
        );

        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        for window in existing {
            let existing_start = window["start_time"]
                .as_str()
                .and_then(|raw| parse_time(raw).ok());
            let existing_end = window["end_time"]
                .as_str()
                .and_then(|raw| parse_time(raw).ok());

            if let (Some(existing_start), Some(existing_end)) = (existing_start, existing_end) {
                if start_time < existing_end && end_time > existing_start {
                    warn!(
                        "Window {}-{} overlaps existing schedule for physio {}",
                        start_time, end_time, physio_id
                    );
                    return Err(SchedulingError::WindowConflict);
                }
            }
        }

        Ok(())
    }

    async fn get_availability_for_day(
        &self,
        physio_id: Uuid,
        weekday: i32,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        let path = format!(
            "/rest/v1/availability?physio_id=eq.{}&weekday=eq.{}&order=start_time.asc",
            physio_id, weekday
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row))
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    async fn get_booked_increments(
        &self,
        physio_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<HashSet<NaiveTime>, SchedulingError> {
        let path = format!(
            "/rest/v1/reservations?physio_id=eq.{}&date=eq.{}&status=neq.cancelled&select=start_time,end_time",
            physio_id, date
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let mut booked = HashSet::new();
        for row in result {
            let start = match row["start_time"].as_str().and_then(|raw| parse_time(raw).ok()) {
                Some(start) => start,
                None => continue,
            };
            let end = row["end_time"].as_str().and_then(|raw| parse_time(raw).ok());

            booked.extend(occupied_increments(start, end));
        }

        Ok(booked)
    }
}

/// Store weekday convention: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}
