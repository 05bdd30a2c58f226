use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{Profile, ProfileRole, TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt::validate_token as validate_jwt;

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match validate_jwt(&token, &config.supabase_jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}

/// Identity plus application role; the lookup the frontend uses to decide
/// between the patient area and the clinic panel.
pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let token = extract_bearer_token(&headers)?;

    let client = SupabaseClient::new(&config);
    let profile = client
        .get_profile(&user.id, &token)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .and_then(|row| serde_json::from_value::<Profile>(row).ok());

    // No profile row means a plain patient account.
    let role = profile
        .as_ref()
        .map(|p| p.role)
        .unwrap_or(ProfileRole::Patient);
    let clinic_id = profile.as_ref().and_then(|p| p.clinic_id);

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
        },
        "role": role,
        "clinic_id": clinic_id,
    })))
}
