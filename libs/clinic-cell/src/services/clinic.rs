use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Profile;

use crate::models::{Clinic, ClinicError, UpdateClinicRequest};

pub struct ClinicService {
    supabase: SupabaseClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Clinics ordered by name, optionally filtered by a case-insensitive
    /// name fragment.
    pub async fn list_clinics(
        &self,
        search: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Clinic>, ClinicError> {
        let mut path = "/rest/v1/clinics?order=name.asc".to_string();
        if let Some(fragment) = search.filter(|s| !s.is_empty()) {
            path.push_str(&format!("&name=ilike.*{}*", fragment));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Clinic>, _>>()
            .map_err(|e| ClinicError::Database(e.to_string()))
    }

    pub async fn get_clinic(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ClinicError::ClinicNotFound)?;
        serde_json::from_value(row).map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// The clinic linked to an operator profile.
    pub fn operator_clinic_id(profile: &Profile) -> Result<Uuid, ClinicError> {
        profile.clinic_id.ok_or(ClinicError::OperatorWithoutClinic)
    }

    pub async fn update_clinic(
        &self,
        clinic_id: Uuid,
        request: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        debug!("Updating clinic: {}", clinic_id);

        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(ClinicError::ValidationError(
                    "Clinic name cannot be empty".to_string(),
                ));
            }
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(location) = request.location {
            update_data.insert("location".to_string(), json!(location));
        }
        if let Some(allow) = request.allow_presential_payment {
            update_data.insert("allow_presential_payment".to_string(), json!(allow));
        }

        if update_data.is_empty() {
            return self.get_clinic(clinic_id, auth_token).await;
        }

        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ClinicError::ClinicNotFound)?;
        serde_json::from_value(row).map_err(|e| ClinicError::Database(e.to_string()))
    }
}
