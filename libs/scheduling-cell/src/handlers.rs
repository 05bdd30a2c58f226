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
use shared_models::auth::Profile;
use shared_models::error::AppError;

use crate::models::{CreateAvailabilityRequest, SchedulingError, SlotQueryParams};
use crate::services::availability::AvailabilityService;

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::InvalidWeekday(_)
        | SchedulingError::InvalidTimeRange
        | SchedulingError::InvalidTime(_)
        | SchedulingError::UnsupportedDuration(_) => AppError::ValidationError(e.to_string()),
        SchedulingError::WindowConflict => AppError::Conflict(e.to_string()),
        SchedulingError::WindowNotFound | SchedulingError::PhysioNotFound => {
            AppError::NotFound(e.to_string())
        }
        SchedulingError::Unauthorized => AppError::Auth(e.to_string()),
        SchedulingError::Database(msg) => AppError::Database(msg),
    }
}

/// Operators may only touch physios of their own clinic.
async fn ensure_operator_owns_physio(
    service: &AvailabilityService,
    profile: &Profile,
    physio_id: Uuid,
    token: &str,
) -> Result<(), AppError> {
    let physio_clinic = service
        .get_physio_clinic(physio_id, token)
        .await
        .map_err(map_scheduling_error)?;

    if profile.clinic_id != Some(physio_clinic) {
        return Err(AppError::Auth(
            "Not authorized to manage this physiotherapist".to_string(),
        ));
    }

    Ok(())
}

/// Bookable slots for a physiotherapist on a given date.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(physio_id): Path<Uuid>,
    Query(params): Query<SlotQueryParams>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = AvailabilityService::new(&state);
    let slots = service
        .get_available_slots(physio_id, params.date, params.duration_minutes, token)
        .await
        .map_err(map_scheduling_error)?;

    let slots: Vec<Value> = slots
        .iter()
        .map(|slot| {
            json!({
                "start_time": slot.start_time.format("%H:%M").to_string(),
                "end_time": slot.end_time.format("%H:%M").to_string(),
                "duration_minutes": slot.duration_minutes,
            })
        })
        .collect();

    Ok(Json(json!({
        "physio_id": physio_id,
        "date": params.date,
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn list_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Path(physio_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AvailabilityService::new(&state);

    ensure_operator_owns_physio(&service, &profile, physio_id, token).await?;

    let windows = service
        .get_physio_availability(physio_id, token)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "availability": windows })))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Path(physio_id): Path<Uuid>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AvailabilityService::new(&state);

    ensure_operator_owns_physio(&service, &profile, physio_id, token).await?;

    let window = service
        .create_availability(physio_id, request, token)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": window,
    })))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Path(window_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AvailabilityService::new(&state);

    let window = service
        .get_window(window_id, token)
        .await
        .map_err(map_scheduling_error)?;
    ensure_operator_owns_physio(&service, &profile, window.physio_id, token).await?;

    service
        .delete_availability(window_id, token)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "success": true })))
}
