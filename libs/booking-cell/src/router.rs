use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;
use shared_utils::gate::{access_gate, ProtectedArea};

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    // Patient-facing booking APIs answer 401 rather than redirect.
    let patient_routes = Router::new()
        .route("/mine", get(handlers::get_my_bookings))
        .route("/{reservation_id}/cancel", post(handlers::cancel_reservation))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let operator_routes = Router::new()
        .route("/clinic", get(handlers::get_clinic_bookings))
        .layer(middleware::from_fn_with_state(
            (state.clone(), ProtectedArea::ClinicPanel),
            access_gate,
        ));

    Router::new()
        .merge(patient_routes)
        .merge(operator_routes)
        .with_state(state)
}
