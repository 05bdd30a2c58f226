use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::gate::{access_gate, ProtectedArea};

use crate::handlers;

/// Patient-area clinic browsing, nested at `/clinics`.
pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_clinics))
        .route("/{clinic_id}", get(handlers::get_clinic))
        .route("/{clinic_id}/physios", get(handlers::get_clinic_physios))
        .layer(middleware::from_fn_with_state(
            (state.clone(), ProtectedArea::PatientArea),
            access_gate,
        ))
        .with_state(state)
}

/// Operator panel, nested at `/clinic-panel`.
pub fn clinic_panel_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/clinic", get(handlers::get_own_clinic))
        .route("/clinic", put(handlers::update_own_clinic))
        .route("/stats", get(handlers::get_clinic_stats))
        .route("/physios", get(handlers::list_own_physios))
        .route("/physios", post(handlers::create_physio))
        .route("/physios/{physio_id}", put(handlers::update_physio))
        .route("/physios/{physio_id}", delete(handlers::deactivate_physio))
        .layer(middleware::from_fn_with_state(
            (state.clone(), ProtectedArea::ClinicPanel),
            access_gate,
        ))
        .with_state(state)
}
