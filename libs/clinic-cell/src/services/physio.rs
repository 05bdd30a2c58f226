use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicError, CreatePhysioRequest, Physiotherapist, UpdatePhysioRequest};

pub struct PhysioService {
    supabase: SupabaseClient,
}

impl PhysioService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_for_clinic(
        &self,
        clinic_id: Uuid,
        active_only: bool,
        auth_token: &str,
    ) -> Result<Vec<Physiotherapist>, ClinicError> {
        let mut path = format!(
            "/rest/v1/physiotherapists?clinic_id=eq.{}&order=name.asc",
            clinic_id
        );
        if active_only {
            path.push_str("&active=eq.true");
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Physiotherapist>, _>>()
            .map_err(|e| ClinicError::Database(e.to_string()))
    }

    pub async fn get_physio(
        &self,
        physio_id: Uuid,
        auth_token: &str,
    ) -> Result<Physiotherapist, ClinicError> {
        let path = format!("/rest/v1/physiotherapists?id=eq.{}", physio_id);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ClinicError::PhysioNotFound)?;
        serde_json::from_value(row).map_err(|e| ClinicError::Database(e.to_string()))
    }

    pub async fn create_physio(
        &self,
        clinic_id: Uuid,
        request: CreatePhysioRequest,
        auth_token: &str,
    ) -> Result<Physiotherapist, ClinicError> {
        if request.name.trim().is_empty() {
            return Err(ClinicError::ValidationError(
                "Physiotherapist name cannot be empty".to_string(),
            ));
        }

        debug!("Creating physiotherapist for clinic: {}", clinic_id);

        let physio_data = json!({
            "clinic_id": clinic_id,
            "name": request.name,
            "specialty": request.specialty,
            "active": true,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/physiotherapists",
                Some(auth_token),
                Some(physio_data),
                Some(headers),
            )
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ClinicError::Database("Failed to create physiotherapist".to_string()))?;
        serde_json::from_value(row).map_err(|e| ClinicError::Database(e.to_string()))
    }

    pub async fn update_physio(
        &self,
        physio_id: Uuid,
        request: UpdatePhysioRequest,
        auth_token: &str,
    ) -> Result<Physiotherapist, ClinicError> {
        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(active) = request.active {
            update_data.insert("active".to_string(), json!(active));
        }

        if update_data.is_empty() {
            return self.get_physio(physio_id, auth_token).await;
        }

        let path = format!("/rest/v1/physiotherapists?id=eq.{}", physio_id);
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

        let row = result.into_iter().next().ok_or(ClinicError::PhysioNotFound)?;
        serde_json::from_value(row).map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// Physios are never deleted, only deactivated, so their past
    /// reservations keep a valid reference.
    pub async fn deactivate_physio(
        &self,
        physio_id: Uuid,
        auth_token: &str,
    ) -> Result<Physiotherapist, ClinicError> {
        self.update_physio(
            physio_id,
            UpdatePhysioRequest {
                name: None,
                specialty: None,
                active: Some(false),
            },
            auth_token,
        )
        .await
    }
}
