use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Profile, User};
use shared_models::error::AppError;

use crate::models::{ClinicBookingsQuery, ReservationError};
use crate::services::reservation::ReservationService;

fn map_reservation_error(e: ReservationError) -> AppError {
    match e {
        ReservationError::NotFound => AppError::NotFound(e.to_string()),
        ReservationError::SlotNotAvailable => AppError::Conflict(e.to_string()),
        ReservationError::MissingField(_) => AppError::ValidationError(e.to_string()),
        ReservationError::InvalidStatusTransition(_) => AppError::BadRequest(e.to_string()),
        ReservationError::Unauthorized => AppError::Auth(e.to_string()),
        ReservationError::Database(msg) => AppError::Database(msg),
    }
}

/// The caller's bookings, joined with clinic and physio details.
#[axum::debug_handler]
pub async fn get_my_bookings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = ReservationService::new(&state);
    let bookings = service
        .list_for_user(&user.id, token)
        .await
        .map_err(map_reservation_error)?;

    Ok(Json(json!({ "bookings": bookings })))
}

#[axum::debug_handler]
pub async fn cancel_reservation(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = ReservationService::new(&state);
    let reservation = service
        .cancel(reservation_id, &user, token)
        .await
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
    })))
}

/// Operator listing for the own clinic, optionally filtered by status. The
/// completion sweep runs inside the service before the rows are returned.
#[axum::debug_handler]
pub async fn get_clinic_bookings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Query(query): Query<ClinicBookingsQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let clinic_id = profile
        .clinic_id
        .ok_or_else(|| AppError::BadRequest("Operator profile has no clinic".to_string()))?;

    let service = ReservationService::new(&state);
    let reservations = service
        .list_for_clinic(clinic_id, query.status, token)
        .await
        .map_err(map_reservation_error)?;

    Ok(Json(json!({
        "clinic_id": clinic_id,
        "reservations": reservations,
    })))
}
