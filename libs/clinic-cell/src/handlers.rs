// libs/clinic-cell/src/handlers.rs
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

use crate::models::{
    ClinicError, ClinicSearchQuery, CreatePhysioRequest, StatsQuery, UpdateClinicRequest,
    UpdatePhysioRequest,
};
use crate::services::clinic::ClinicService;
use crate::services::physio::PhysioService;
use crate::services::stats::StatsService;

fn map_clinic_error(e: ClinicError) -> AppError {
    match e {
        ClinicError::ClinicNotFound | ClinicError::PhysioNotFound => {
            AppError::NotFound(e.to_string())
        }
        ClinicError::OperatorWithoutClinic => AppError::BadRequest(e.to_string()),
        ClinicError::Unauthorized => AppError::Auth(e.to_string()),
        ClinicError::ValidationError(msg) => AppError::ValidationError(msg),
        ClinicError::Database(msg) => AppError::Database(msg),
    }
}

async fn ensure_physio_belongs_to_operator(
    service: &PhysioService,
    profile: &Profile,
    physio_id: Uuid,
    token: &str,
) -> Result<(), AppError> {
    let physio = service
        .get_physio(physio_id, token)
        .await
        .map_err(map_clinic_error)?;

    if profile.clinic_id != Some(physio.clinic_id) {
        return Err(AppError::Auth(
            "Not authorized to manage this physiotherapist".to_string(),
        ));
    }

    Ok(())
}

// ==============================================================================
// PATIENT AREA HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_clinics(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ClinicSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = ClinicService::new(&state);
    let clinics = service
        .list_clinics(query.search.as_deref(), token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "clinics": clinics })))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = ClinicService::new(&state);
    let clinic = service
        .get_clinic(clinic_id, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "clinic": clinic })))
}

/// Active physiotherapists of a clinic, for the booking form.
#[axum::debug_handler]
pub async fn get_clinic_physios(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PhysioService::new(&state);
    let physios = service
        .list_for_clinic(clinic_id, true, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "physios": physios })))
}

// ==============================================================================
// CLINIC PANEL HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_own_clinic(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let clinic_id = ClinicService::operator_clinic_id(&profile).map_err(map_clinic_error)?;

    let service = ClinicService::new(&state);
    let clinic = service
        .get_clinic(clinic_id, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "clinic": clinic })))
}

#[axum::debug_handler]
pub async fn update_own_clinic(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let clinic_id = ClinicService::operator_clinic_id(&profile).map_err(map_clinic_error)?;

    let service = ClinicService::new(&state);
    let clinic = service
        .update_clinic(clinic_id, request, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "clinic": clinic,
    })))
}

#[axum::debug_handler]
pub async fn get_clinic_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let clinic_id = ClinicService::operator_clinic_id(&profile).map_err(map_clinic_error)?;

    let service = StatsService::new(&state);
    let stats = service
        .get_clinic_stats(clinic_id, query.range.unwrap_or_default(), token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "clinic_id": clinic_id,
        "stats": stats,
    })))
}

#[axum::debug_handler]
pub async fn list_own_physios(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let clinic_id = ClinicService::operator_clinic_id(&profile).map_err(map_clinic_error)?;

    let service = PhysioService::new(&state);
    // Panel listings include deactivated physios.
    let physios = service
        .list_for_clinic(clinic_id, false, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({ "physios": physios })))
}

#[axum::debug_handler]
pub async fn create_physio(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Json(request): Json<CreatePhysioRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let clinic_id = ClinicService::operator_clinic_id(&profile).map_err(map_clinic_error)?;

    let service = PhysioService::new(&state);
    let physio = service
        .create_physio(clinic_id, request, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "physio": physio,
    })))
}

#[axum::debug_handler]
pub async fn update_physio(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Path(physio_id): Path<Uuid>,
    Json(request): Json<UpdatePhysioRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PhysioService::new(&state);
    ensure_physio_belongs_to_operator(&service, &profile, physio_id, token).await?;

    let physio = service
        .update_physio(physio_id, request, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "physio": physio,
    })))
}

#[axum::debug_handler]
pub async fn deactivate_physio(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(profile): Extension<Profile>,
    Path(physio_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = PhysioService::new(&state);
    ensure_physio_belongs_to_operator(&service, &profile, physio_id, token).await?;

    let physio = service
        .deactivate_physio(physio_id, token)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "physio": physio,
    })))
}
