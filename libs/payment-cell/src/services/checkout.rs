// libs/payment-cell/src/services/checkout.rs
use tracing::{debug, info};

use booking_cell::models::{NewReservation, PaymentStatus, ReservationStatus};
use booking_cell::services::reservation::{ConflictTarget, ReservationService};
use clinic_cell::services::clinic::ClinicService;
use scheduling_cell::services::availability::AvailabilityService;
use scheduling_cell::services::slots::{
    parse_time, slot_end, SLOT_INCREMENT_MINUTES, SUPPORTED_DURATIONS_MINUTES,
};
use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{CheckoutOutcome, CheckoutRequest, PaymentError, SessionMetadata};
use crate::services::stripe::{CreateCheckoutSessionParams, StripeClient};

/// The single booking-submission flow: one validation path, then a fork on
/// the clinic's payment mode. Presential clinics get their reservation
/// written immediately; everyone else is sent to the hosted checkout and the
/// reservation is only written once the webhook confirms payment.
pub struct CheckoutService {
    config: AppConfig,
    availability: AvailabilityService,
    reservations: ReservationService,
    clinics: ClinicService,
}

impl CheckoutService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
            availability: AvailabilityService::new(config),
            reservations: ReservationService::new(config),
            clinics: ClinicService::new(config),
        }
    }

    pub async fn submit(
        &self,
        request: CheckoutRequest,
        caller: &User,
        auth_token: &str,
    ) -> Result<CheckoutOutcome, PaymentError> {
        // Everything rejectable without leaving the process is rejected first.
        if request.user_name.trim().is_empty() {
            return Err(PaymentError::MissingField("user_name"));
        }
        if request.time.trim().is_empty() {
            return Err(PaymentError::MissingField("time"));
        }

        let start_time =
            parse_time(&request.time).map_err(|_| PaymentError::InvalidTime(request.time.clone()))?;

        let duration_minutes = request.duration_minutes.unwrap_or(SLOT_INCREMENT_MINUTES);
        if !SUPPORTED_DURATIONS_MINUTES.contains(&duration_minutes) {
            return Err(PaymentError::UnsupportedDuration(duration_minutes));
        }

        // Re-check availability at submission time; the render-time slot list
        // may be stale by now.
        let still_available = self
            .availability
            .is_slot_available(
                request.physio_id,
                request.date,
                start_time,
                duration_minutes,
                auth_token,
            )
            .await?;
        if !still_available {
            return Err(PaymentError::SlotNotAvailable);
        }

        let clinic = self.clinics.get_clinic(request.clinic_id, auth_token).await?;

        if clinic.allow_presential_payment {
            debug!(
                "Clinic {} allows presential payment, persisting reservation directly",
                clinic.id
            );

            let new = NewReservation {
                clinic_id: request.clinic_id,
                physio_id: request.physio_id,
                user_id: caller.id.parse().ok(),
                user_name: request.user_name.clone(),
                user_email: request.user_email.clone(),
                date: request.date,
                start_time,
                end_time: Some(slot_end(start_time, duration_minutes)),
                status: ReservationStatus::Pending,
                payment_status: PaymentStatus::Presential,
                price_cents: Some(self.config.session_price_cents),
                checkout_session_id: None,
            };

            let reservation = self
                .reservations
                .insert_reservation(&new, ConflictTarget::SlotTuple, auth_token)
                .await?
                .ok_or(PaymentError::SlotNotAvailable)?;

            info!(
                "Presential reservation {} created for clinic {}",
                reservation.id, clinic.id
            );
            return Ok(CheckoutOutcome::Presential { reservation });
        }

        // Online path: the reservation travels as session metadata and is
        // only persisted by the payment webhook.
        let stripe = StripeClient::new(&self.config)?;

        let metadata = SessionMetadata {
            clinic_id: request.clinic_id.to_string(),
            physio_id: request.physio_id.to_string(),
            user_id: Some(caller.id.clone()),
            user_name: request.user_name.clone(),
            user_email: request.user_email.clone(),
            date: request.date.to_string(),
            time: start_time.format("%H:%M").to_string(),
            duration_minutes: Some(duration_minutes.to_string()),
            price_cents: Some(self.config.session_price_cents.to_string()),
        };

        let params = CreateCheckoutSessionParams {
            product_name: "Sesión de fisioterapia".to_string(),
            description: format!("{} — {}", request.date, metadata.time),
            unit_amount_cents: self.config.session_price_cents,
            currency: "eur".to_string(),
            success_url: format!(
                "{}/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.config.site_url
            ),
            cancel_url: format!("{}/clinics/{}", self.config.site_url, request.clinic_id),
            metadata,
        };

        let session = stripe.create_checkout_session(&params).await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("Checkout session has no redirect URL".to_string()))?;

        info!(
            "Checkout session {} created for physio {} on {}",
            session.id, request.physio_id, request.date
        );
        Ok(CheckoutOutcome::OnlinePayment { url })
    }
}
