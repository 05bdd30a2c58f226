// libs/shared/utils/src/gate.rs
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{Profile, ProfileRole, User};

use crate::jwt::validate_token;

pub const LOGIN_PATH: &str = "/login";
pub const PATIENT_AREA_PATH: &str = "/clinics";

/// Who is knocking, as far as the gate is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Anonymous,
    Patient,
    Operator,
}

/// The two role-restricted path prefixes of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedArea {
    /// Clinic browsing and booking pages: any authenticated user.
    PatientArea,
    /// Clinic management panel: clinic operators only.
    ClinicPanel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Allow,
    RedirectToLogin,
    RedirectToPatientArea,
}

/// The gate's transition table. Pure so the policy is testable without HTTP:
/// anonymous callers always go to login, patients bounce off the clinic panel,
/// operators pass everywhere.
pub fn evaluate(role: SessionRole, area: ProtectedArea) -> GateOutcome {
    match (role, area) {
        (SessionRole::Anonymous, _) => GateOutcome::RedirectToLogin,
        (SessionRole::Patient, ProtectedArea::ClinicPanel) => GateOutcome::RedirectToPatientArea,
        (SessionRole::Patient, ProtectedArea::PatientArea) => GateOutcome::Allow,
        (SessionRole::Operator, _) => GateOutcome::Allow,
    }
}

async fn resolve_session(
    config: &AppConfig,
    headers: &HeaderMap,
) -> (SessionRole, Option<User>, Option<Profile>) {
    let token = match headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => return (SessionRole::Anonymous, None, None),
    };

    let user = match validate_token(token, &config.supabase_jwt_secret) {
        Ok(user) => user,
        Err(reason) => {
            debug!("Gate rejected session token: {}", reason);
            return (SessionRole::Anonymous, None, None);
        }
    };

    // Application role lives in the profiles table; a user without a profile
    // row is treated as a patient.
    let supabase = SupabaseClient::new(config);
    let profile = match supabase.get_profile(&user.id, token).await {
        Ok(Some(row)) => serde_json::from_value::<Profile>(row).ok(),
        Ok(None) => None,
        Err(e) => {
            debug!("Profile lookup failed for {}: {}", user.id, e);
            None
        }
    };

    let role = match profile.as_ref().map(|p| p.role) {
        Some(ProfileRole::ClinicOperator) => SessionRole::Operator,
        _ => SessionRole::Patient,
    };

    (role, Some(user), profile)
}

/// Redirecting middleware for the role-restricted areas. Allowed requests get
/// the resolved `User` (and `Profile`, when present) inserted into extensions.
pub async fn access_gate(
    State((config, area)): State<(Arc<AppConfig>, ProtectedArea)>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let (role, user, profile) = resolve_session(&config, request.headers()).await;

    match evaluate(role, area) {
        GateOutcome::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
        GateOutcome::RedirectToPatientArea => Redirect::to(PATIENT_AREA_PATH).into_response(),
        GateOutcome::Allow => {
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            if let Some(profile) = profile {
                request.extensions_mut().insert(profile);
            }
            request.extensions_mut().insert(role);
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_sent_to_login_everywhere() {
        assert_eq!(
            evaluate(SessionRole::Anonymous, ProtectedArea::PatientArea),
            GateOutcome::RedirectToLogin
        );
        assert_eq!(
            evaluate(SessionRole::Anonymous, ProtectedArea::ClinicPanel),
            GateOutcome::RedirectToLogin
        );
    }

    #[test]
    fn patient_bounces_off_the_clinic_panel() {
        assert_eq!(
            evaluate(SessionRole::Patient, ProtectedArea::ClinicPanel),
            GateOutcome::RedirectToPatientArea
        );
        assert_eq!(
            evaluate(SessionRole::Patient, ProtectedArea::PatientArea),
            GateOutcome::Allow
        );
    }

    #[test]
    fn operator_passes_everywhere() {
        assert_eq!(
            evaluate(SessionRole::Operator, ProtectedArea::PatientArea),
            GateOutcome::Allow
        );
        assert_eq!(
            evaluate(SessionRole::Operator, ProtectedArea::ClinicPanel),
            GateOutcome::Allow
        );
    }
}
