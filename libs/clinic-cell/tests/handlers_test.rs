use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinic_cell::router::{clinic_panel_routes, clinic_routes};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn patient_area_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());
    let app = clinic_routes(config.to_arc());
    (app, config)
}

async fn panel_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::default().with_supabase_url(&mock_server.uri());
    let app = clinic_panel_routes(config.to_arc());
    (app, config)
}

async fn mock_profile(mock_server: &MockServer, user: &TestUser, role: &str, clinic_id: Option<&str>) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::profile_response(&user.id, role, clinic_id)
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn patients_can_browse_and_search_clinics() {
    let mock_server = MockServer::start().await;
    let (app, config) = patient_area_app(&mock_server).await;

    let user = TestUser::patient("paciente@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mock_profile(&mock_server, &user, "patient", None).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("name", "ilike.*fisio*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_response(
                &Uuid::new_v4().to_string(),
                "FisioMotion Barcelona",
                true,
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/?search=fisio")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let clinics = json_response["clinics"].as_array().unwrap();
    assert_eq!(clinics.len(), 1);
    assert_eq!(clinics[0]["name"], "FisioMotion Barcelona");
}

#[tokio::test]
async fn anonymous_browsing_redirects_to_login() {
    let mock_server = MockServer::start().await;
    let (app, _config) = patient_area_app(&mock_server).await;

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");
}

#[tokio::test]
async fn patients_are_redirected_out_of_the_clinic_panel() {
    let mock_server = MockServer::start().await;
    let (app, config) = panel_app(&mock_server).await;

    let user = TestUser::patient("paciente@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mock_profile(&mock_server, &user, "patient", None).await;

    let request = Request::builder()
        .method("GET")
        .uri("/clinic")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/clinics");
}

#[tokio::test]
async fn operator_reads_and_updates_the_own_clinic() {
    let mock_server = MockServer::start().await;
    let (app, config) = panel_app(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let operator = TestUser::operator("clinica@example.com");
    let token = JwtTestUtils::create_test_token(&operator, &config.jwt_secret, Some(24));
    mock_profile(&mock_server, &operator, "clinic_operator", Some(&clinic_id.to_string())).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_response(&clinic_id.to_string(), "Nuevo nombre", true)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PUT")
        .uri("/clinic")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "Nuevo nombre" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["success"], true);
    assert_eq!(json_response["clinic"]["name"], "Nuevo nombre");
}

#[tokio::test]
async fn stats_aggregate_the_clinic_reservations() {
    let mock_server = MockServer::start().await;
    let (app, config) = panel_app(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let physio_id = Uuid::new_v4();
    let operator = TestUser::operator("clinica@example.com");
    let token = JwtTestUtils::create_test_token(&operator, &config.jwt_secret, Some(24));
    mock_profile(&mock_server, &operator, "clinic_operator", Some(&clinic_id.to_string())).await;

    let recent = (Utc::now() - Duration::days(2)).date_naive().to_string();

    let row = |status: &str| {
        MockSupabaseResponses::reservation_response(
            &Uuid::new_v4().to_string(),
            &clinic_id.to_string(),
            &physio_id.to_string(),
            &recent,
            "10:00:00",
            status,
        )
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row("accepted"),
            row("completed"),
            row("pending"),
            row("cancelled"),
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/stats?range=month")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let stats = &json_response["stats"];
    assert_eq!(stats["total"], 4);
    assert_eq!(stats["accepted"], 1);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["cancelled"], 1);
    // Mock rows carry 4000 cents each; accepted + completed count.
    assert_eq!(stats["revenue_cents"], 8000);
}

#[tokio::test]
async fn operator_cannot_touch_a_foreign_physio() {
    let mock_server = MockServer::start().await;
    let (app, config) = panel_app(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let foreign_physio = Uuid::new_v4();
    let operator = TestUser::operator("clinica@example.com");
    let token = JwtTestUtils::create_test_token(&operator, &config.jwt_secret, Some(24));
    mock_profile(&mock_server, &operator, "clinic_operator", Some(&clinic_id.to_string())).await;

    // Belongs to some other clinic.
    Mock::given(method("GET"))
        .and(path("/rest/v1/physiotherapists"))
        .and(query_param("id", format!("eq.{}", foreign_physio)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::physio_response(
                &foreign_physio.to_string(),
                &Uuid::new_v4().to_string(),
                "Laura",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/physiotherapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/physios/{}", foreign_physio))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "Otro" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn operator_registers_a_new_physio() {
    let mock_server = MockServer::start().await;
    let (app, config) = panel_app(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let operator = TestUser::operator("clinica@example.com");
    let token = JwtTestUtils::create_test_token(&operator, &config.jwt_secret, Some(24));
    mock_profile(&mock_server, &operator, "clinic_operator", Some(&clinic_id.to_string())).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/physiotherapists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::physio_response(
                &Uuid::new_v4().to_string(),
                &clinic_id.to_string(),
                "Laura",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/physios")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "name": "Laura", "specialty": "Fisioterapia deportiva" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["success"], true);
    assert_eq!(json_response["physio"]["name"], "Laura");
}
