// libs/booking-cell/src/services/reservation.rs
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{Profile, ProfileRole, User};

use crate::models::{
    BookingWithDetails, ClinicSummary, NewReservation, PhysioSummary, Reservation,
    ReservationError, ReservationStatus,
};

/// Unique column set a conditional insert defers to. The store carries a
/// unique index for each; `resolution=ignore-duplicates` turns a lost race
/// into an empty representation instead of an error.
#[derive(Debug, Clone, Copy)]
pub enum ConflictTarget {
    /// One reservation per physio/date/start tuple.
    SlotTuple,
    /// One reservation per checkout session (webhook replay protection).
    CheckoutSession,
}

impl ConflictTarget {
    fn columns(&self) -> &'static str {
        match self {
            ConflictTarget::SlotTuple => "physio_id,date,start_time",
            ConflictTarget::CheckoutSession => "checkout_session_id",
        }
    }
}

pub struct ReservationService {
    supabase: SupabaseClient,
}

impl ReservationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Conditional insert. `Ok(None)` means another row already owns the
    /// conflict target — the caller decides whether that is a lost slot race
    /// or an already-processed webhook.
    pub async fn insert_reservation(
        &self,
        new: &NewReservation,
        target: ConflictTarget,
        auth_token: &str,
    ) -> Result<Option<Reservation>, ReservationError> {
        debug!(
            "Inserting reservation for physio {} on {} at {}",
            new.physio_id, new.date, new.start_time
        );

        let path = format!("/rest/v1/reservations?on_conflict={}", target.columns());

        let body = serde_json::to_value(new)
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static(
                "resolution=ignore-duplicates,return=representation",
            ),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::POST, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let reservation: Reservation = serde_json::from_value(row)
                    .map_err(|e| ReservationError::Database(e.to_string()))?;
                info!("Reservation {} created", reservation.id);
                Ok(Some(reservation))
            }
            None => {
                warn!(
                    "Conditional insert ignored for physio {} on {} at {} ({:?})",
                    new.physio_id, new.date, new.start_time, target
                );
                Ok(None)
            }
        }
    }

    pub async fn get_reservation(
        &self,
        reservation_id: Uuid,
        auth_token: &str,
    ) -> Result<Reservation, ReservationError> {
        let path = format!("/rest/v1/reservations?id=eq.{}", reservation_id);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ReservationError::NotFound)?;
        serde_json::from_value(row).map_err(|e| ReservationError::Database(e.to_string()))
    }

    pub async fn find_by_checkout_session(
        &self,
        session_id: &str,
        auth_token: &str,
    ) -> Result<Option<Reservation>, ReservationError> {
        let path = format!(
            "/rest/v1/reservations?checkout_session_id=eq.{}",
            session_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let reservation = serde_json::from_value(row)
                    .map_err(|e| ReservationError::Database(e.to_string()))?;
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }

    /// The caller's reservations, each joined with clinic and physio summaries.
    /// The store is queried per table and combined here, so no relational
    /// features beyond equality filters are required of it.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<BookingWithDetails>, ReservationError> {
        let path = format!(
            "/rest/v1/reservations?user_id=eq.{}&order=date.asc,start_time.asc",
            user_id
        );
        let reservations = self.fetch_reservations(&path, auth_token).await?;

        let clinics: Vec<ClinicSummary> = self
            .fetch_rows("/rest/v1/clinics?select=id,name,location", auth_token)
            .await?;
        let physios: Vec<PhysioSummary> = self
            .fetch_rows(
                "/rest/v1/physiotherapists?select=id,name,clinic_id",
                auth_token,
            )
            .await?;

        Ok(reservations
            .into_iter()
            .map(|reservation| {
                let clinic = clinics
                    .iter()
                    .find(|c| c.id == reservation.clinic_id)
                    .cloned();
                let physio = physios
                    .iter()
                    .find(|p| p.id == reservation.physio_id)
                    .cloned();
                BookingWithDetails {
                    reservation,
                    clinic,
                    physio,
                }
            })
            .collect())
    }

    /// Clinic-side listing. Runs the completion sweep first so operators see
    /// past accepted sessions as completed, the way the panel always has.
    pub async fn list_for_clinic(
        &self,
        clinic_id: Uuid,
        status: Option<ReservationStatus>,
        auth_token: &str,
    ) -> Result<Vec<Reservation>, ReservationError> {
        self.sweep_completed(clinic_id, Utc::now(), auth_token).await?;

        let mut path = format!(
            "/rest/v1/reservations?clinic_id=eq.{}&order=date.asc,start_time.asc",
            clinic_id
        );
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }

        self.fetch_reservations(&path, auth_token).await
    }

    /// Promote accepted reservations whose start already passed to completed.
    pub async fn sweep_completed(
        &self,
        clinic_id: Uuid,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<usize, ReservationError> {
        let path = format!(
            "/rest/v1/reservations?clinic_id=eq.{}&status=eq.accepted",
            clinic_id
        );
        let accepted = self.fetch_reservations(&path, auth_token).await?;

        let past_ids = past_accepted_ids(&accepted, now);
        if past_ids.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = past_ids.iter().map(|id| id.to_string()).collect();
        let update_path = format!("/rest/v1/reservations?id=in.({})", ids.join(","));

        self.supabase
            .request_no_content(
                Method::PATCH,
                &update_path,
                Some(auth_token),
                Some(json!({ "status": ReservationStatus::Completed })),
            )
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        info!(
            "Completion sweep marked {} reservations for clinic {}",
            past_ids.len(),
            clinic_id
        );
        Ok(past_ids.len())
    }

    /// Cancel a reservation. Allowed for the booking owner and for the
    /// operator of the clinic the booking belongs to.
    pub async fn cancel(
        &self,
        reservation_id: Uuid,
        caller: &User,
        auth_token: &str,
    ) -> Result<Reservation, ReservationError> {
        let reservation = self.get_reservation(reservation_id, auth_token).await?;

        match reservation.status {
            ReservationStatus::Pending | ReservationStatus::Accepted => {}
            other => return Err(ReservationError::InvalidStatusTransition(other)),
        }

        let is_owner = reservation
            .user_id
            .map(|id| id.to_string() == caller.id)
            .unwrap_or(false);

        let is_clinic_operator = if is_owner {
            false
        } else {
            match self.fetch_profile(&caller.id, auth_token).await? {
                Some(profile) => {
                    profile.role == ProfileRole::ClinicOperator
                        && profile.clinic_id == Some(reservation.clinic_id)
                }
                None => false,
            }
        };

        if !is_owner && !is_clinic_operator {
            return Err(ReservationError::Unauthorized);
        }

        let path = format!("/rest/v1/reservations?id=eq.{}", reservation_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "status": ReservationStatus::Cancelled })),
                Some(headers),
            )
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ReservationError::NotFound)?;
        let cancelled: Reservation =
            serde_json::from_value(row).map_err(|e| ReservationError::Database(e.to_string()))?;

        info!("Reservation {} cancelled by {}", reservation_id, caller.id);
        Ok(cancelled)
    }

    // Private helper methods

    async fn fetch_reservations(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Reservation>, ReservationError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Reservation>, _>>()
            .map_err(|e| ReservationError::Database(e.to_string()))
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<T>, ReservationError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| ReservationError::Database(e.to_string()))
    }

    async fn fetch_profile(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Option<Profile>, ReservationError> {
        let row = self
            .supabase
            .get_profile(user_id, auth_token)
            .await
            .map_err(|e| ReservationError::Database(e.to_string()))?;

        Ok(row.and_then(|value| serde_json::from_value(value).ok()))
    }
}

/// Accepted reservations whose start already passed. Pure so the sweep rule
/// can be tested with a fixed `now`.
pub fn past_accepted_ids(reservations: &[Reservation], now: DateTime<Utc>) -> Vec<Uuid> {
    reservations
        .iter()
        .filter(|r| r.status == ReservationStatus::Accepted && r.starts_at() < now.naive_utc())
        .map(|r| r.id)
        .collect()
}
