// libs/payment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CheckoutOutcome, CheckoutRequest, PaymentError, StripeEvent};
use crate::services::checkout::CheckoutService;
use crate::services::stripe::StripeClient;
use crate::services::webhook::{verify_signature, WebhookService};

fn map_payment_error(e: PaymentError) -> AppError {
    match e {
        PaymentError::MissingField(_)
        | PaymentError::UnsupportedDuration(_)
        | PaymentError::InvalidTime(_) => AppError::ValidationError(e.to_string()),
        PaymentError::InvalidMetadata(_) | PaymentError::SignatureVerification(_) => {
            AppError::BadRequest(e.to_string())
        }
        PaymentError::SlotNotAvailable => AppError::Conflict(e.to_string()),
        PaymentError::ClinicNotFound => AppError::NotFound(e.to_string()),
        PaymentError::NotConfigured | PaymentError::Stripe(_) => {
            AppError::ExternalService(e.to_string())
        }
        PaymentError::Database(msg) => AppError::Database(msg),
    }
}

/// Booking submission. Returns either a direct presential confirmation or the
/// hosted checkout URL the client must redirect to.
#[axum::debug_handler]
pub async fn checkout(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = CheckoutService::new(&state);
    let outcome = service
        .submit(request, &user, token)
        .await
        .map_err(map_payment_error)?;

    match outcome {
        CheckoutOutcome::Presential { reservation } => Ok(Json(json!({
            "success": true,
            "presential": true,
            "message": "Reserva creada con pago presencial.",
            "reservation": reservation,
        }))),
        CheckoutOutcome::OnlinePayment { url } => Ok(Json(json!({ "url": url }))),
    }
}

/// Stripe webhook receiver. The raw body is needed for signature
/// verification, so the payload is parsed only after the signature holds.
#[axum::debug_handler]
pub async fn stripe_webhook(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    verify_signature(&body, signature, &state.stripe_webhook_secret, Utc::now())
        .map_err(map_payment_error)?;

    let event: StripeEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {}", e)))?;

    // Webhook calls carry no user session; store writes run with the anon key.
    let service = WebhookService::new(&state);
    service
        .handle_event(event, &state.supabase_anon_key)
        .await
        .map_err(map_payment_error)?;

    Ok(Json(json!({ "received": true })))
}

/// Session metadata lookup for the post-payment success page. Read-only; the
/// webhook remains the only confirmation writer.
#[axum::debug_handler]
pub async fn get_stripe_session(
    State(state): State<Arc<AppConfig>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let stripe = StripeClient::new(&state).map_err(map_payment_error)?;

    let session = stripe
        .get_checkout_session(&session_id)
        .await
        .map_err(map_payment_error)?;

    Ok(Json(json!({
        "id": session.id,
        "payment_status": session.payment_status,
        "metadata": session.metadata,
    })))
}
