use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::router::payment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

// One wiremock server plays both collaborators; Supabase and Stripe live on
// disjoint path prefixes.
async fn create_test_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::default()
        .with_supabase_url(&mock_server.uri())
        .with_stripe_api_base(&mock_server.uri());
    let app = payment_routes(config.to_arc());
    (app, config)
}

async fn mock_open_monday_schedule(mock_server: &MockServer, physio_id: Uuid) {
    // 2026-03-09 is a Monday -> weekday index 1.
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability"))
        .and(query_param("physio_id", format!("eq.{}", physio_id)))
        .and(query_param("weekday", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &Uuid::new_v4().to_string(),
                &physio_id.to_string(),
                1,
                "09:00:00",
                "17:00:00",
            )
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("physio_id", format!("eq.{}", physio_id)))
        .and(query_param("date", "eq.2026-03-09"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

fn checkout_body(clinic_id: Uuid, physio_id: Uuid) -> String {
    json!({
        "clinic_id": clinic_id,
        "physio_id": physio_id,
        "user_name": "Paciente Test",
        "user_email": "paciente@example.com",
        "date": "2026-03-09",
        "time": "10:00",
        "duration_minutes": 60
    })
    .to_string()
}

#[tokio::test]
async fn presential_clinic_persists_the_reservation_directly() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let user = TestUser::patient("paciente@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let clinic_id = Uuid::new_v4();
    let physio_id = Uuid::new_v4();

    mock_open_monday_schedule(&mock_server, physio_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_response(&clinic_id.to_string(), "FisioMotion", true)
        ])))
        .mount(&mock_server)
        .await;

    // Exactly one conditional insert.
    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::reservation_response(
                &Uuid::new_v4().to_string(),
                &clinic_id.to_string(),
                &physio_id.to_string(),
                "2026-03-09",
                "10:00:00",
                "pending",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(checkout_body(clinic_id, physio_id)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["success"], true);
    assert_eq!(json_response["presential"], true);
    assert_eq!(json_response["reservation"]["status"], "pending");
    assert_eq!(json_response["reservation"]["payment_status"], "presential");
}

#[tokio::test]
async fn online_clinic_gets_a_checkout_redirect_and_no_insert() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let user = TestUser::patient("paciente@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let clinic_id = Uuid::new_v4();
    let physio_id = Uuid::new_v4();

    mock_open_monday_schedule(&mock_server, physio_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_response(&clinic_id.to_string(), "FisioMotion", false)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "url": "https://checkout.stripe.com/pay/cs_test_123"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The reservation is only written once the webhook confirms payment.
    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(checkout_body(clinic_id, physio_id)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(
        json_response["url"],
        "https://checkout.stripe.com/pay/cs_test_123"
    );
}

#[tokio::test]
async fn missing_fields_are_rejected_before_any_external_call() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let user = TestUser::patient("paciente@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let body = json!({
        "clinic_id": Uuid::new_v4(),
        "physio_id": Uuid::new_v4(),
        "user_name": "",
        "date": "2026-03-09",
        "time": "10:00"
    })
    .to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No collaborator was contacted.
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn losing_the_insert_race_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let user = TestUser::patient("paciente@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let clinic_id = Uuid::new_v4();
    let physio_id = Uuid::new_v4();

    mock_open_monday_schedule(&mock_server, physio_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_response(&clinic_id.to_string(), "FisioMotion", true)
        ])))
        .mount(&mock_server)
        .await;

    // `resolution=ignore-duplicates` answers an empty representation when
    // another booking already owns the slot tuple.
    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(checkout_body(clinic_id, physio_id)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn booked_slot_is_rejected_at_submission_time() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let user = TestUser::patient("paciente@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let clinic_id = Uuid::new_v4();
    let physio_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability"))
        .and(query_param("physio_id", format!("eq.{}", physio_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &Uuid::new_v4().to_string(),
                &physio_id.to_string(),
                1,
                "09:00:00",
                "17:00:00",
            )
        ])))
        .mount(&mock_server)
        .await;

    // 10:00 got booked between render and submit.
    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("physio_id", format!("eq.{}", physio_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "start_time": "10:00:00", "end_time": "11:00:00" }
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(checkout_body(clinic_id, physio_id)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
