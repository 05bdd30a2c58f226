use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::gate::{access_gate, ProtectedArea};

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    // Slot queries belong to the patient booking flow.
    let patient_routes = Router::new()
        .route("/{physio_id}/available-slots", get(handlers::get_available_slots))
        .layer(middleware::from_fn_with_state(
            (state.clone(), ProtectedArea::PatientArea),
            access_gate,
        ));

    // Window management is clinic-panel territory.
    let operator_routes = Router::new()
        .route("/{physio_id}/availability", get(handlers::list_availability))
        .route("/{physio_id}/availability", post(handlers::create_availability))
        .route("/availability/{window_id}", delete(handlers::delete_availability))
        .layer(middleware::from_fn_with_state(
            (state.clone(), ProtectedArea::ClinicPanel),
            access_gate,
        ));

    Router::new()
        .merge(patient_routes)
        .merge(operator_routes)
        .with_state(state)
}
