use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use auth_cell::router::auth_routes;
use booking_cell::router::booking_routes;
use clinic_cell::router::{clinic_panel_routes, clinic_routes};
use payment_cell::router::payment_routes;
use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "FisioReserva API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/clinics", clinic_routes(state.clone()))
        .nest("/clinic-panel", clinic_panel_routes(state.clone()))
        .nest("/physios", scheduling_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/payments", payment_routes(state))
}
