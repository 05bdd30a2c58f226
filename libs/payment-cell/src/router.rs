use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn payment_routes(state: Arc<AppConfig>) -> Router {
    // The webhook is authenticated by its signature, the session lookup is
    // read-only; only checkout itself requires a user session.
    let public_routes = Router::new()
        .route("/webhook", post(handlers::stripe_webhook))
        .route("/session/{session_id}", get(handlers::get_stripe_session));

    let protected_routes = Router::new()
        .route("/checkout", post(handlers::checkout))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
