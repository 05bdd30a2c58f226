use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::router::payment_routes;
use shared_utils::test_utils::{MockSupabaseResponses, StripeTestUtils, TestConfig};

async fn create_test_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::default()
        .with_supabase_url(&mock_server.uri())
        .with_stripe_api_base(&mock_server.uri());
    let app = payment_routes(config.to_arc());
    (app, config)
}

fn completed_event_payload(session_id: &str, clinic_id: Uuid, physio_id: Uuid) -> String {
    StripeTestUtils::checkout_completed_event(
        session_id,
        json!({
            "clinic_id": clinic_id,
            "physio_id": physio_id,
            "user_name": "Paciente Test",
            "user_email": "paciente@example.com",
            "date": "2026-03-09",
            "time": "16:30",
            "duration_minutes": "60",
            "price_cents": "4000"
        }),
        4000,
    )
    .to_string()
}

fn webhook_request(payload: String, signature: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("Stripe-Signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

#[tokio::test]
async fn completed_session_persists_an_accepted_paid_reservation() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let physio_id = Uuid::new_v4();
    let session_id = "cs_test_abc";

    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("checkout_session_id", format!("eq.{}", session_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::reservation_response(
                &Uuid::new_v4().to_string(),
                &clinic_id.to_string(),
                &physio_id.to_string(),
                "2026-03-09",
                "16:30:00",
                "accepted",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let payload = completed_event_payload(session_id, clinic_id, physio_id);
    let signature = StripeTestUtils::sign_payload(
        &payload,
        &config.stripe_webhook_secret,
        Utc::now().timestamp(),
    );

    let response = app.oneshot(webhook_request(payload, signature)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["received"], true);
}

#[tokio::test]
async fn replayed_delivery_does_not_create_a_second_reservation() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let physio_id = Uuid::new_v4();
    let session_id = "cs_test_replayed";

    // The session id is already recorded.
    Mock::given(method("GET"))
        .and(path("/rest/v1/reservations"))
        .and(query_param("checkout_session_id", format!("eq.{}", session_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::reservation_response(
                &Uuid::new_v4().to_string(),
                &clinic_id.to_string(),
                &physio_id.to_string(),
                "2026-03-09",
                "16:30:00",
                "accepted",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reservations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let payload = completed_event_payload(session_id, clinic_id, physio_id);
    let signature = StripeTestUtils::sign_payload(
        &payload,
        &config.stripe_webhook_secret,
        Utc::now().timestamp(),
    );

    let response = app.oneshot(webhook_request(payload, signature)).await.unwrap();

    // Replay is acknowledged, never re-processed.
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_signature_is_fatal() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server).await;

    let payload = completed_event_payload("cs_test_forged", Uuid::new_v4(), Uuid::new_v4());
    let signature =
        StripeTestUtils::sign_payload(&payload, "whsec_wrong_secret", Utc::now().timestamp());

    let response = app.oneshot(webhook_request(payload, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_fatal() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server).await;

    let payload = completed_event_payload("cs_test_unsigned", Uuid::new_v4(), Uuid::new_v4());

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrelated_event_types_are_acknowledged_and_ignored() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server).await;

    let payload = json!({
        "id": "evt_other",
        "type": "payment_intent.succeeded",
        "data": { "object": {} }
    })
    .to_string();
    let signature = StripeTestUtils::sign_payload(
        &payload,
        &config.stripe_webhook_secret,
        Utc::now().timestamp(),
    );

    let response = app.oneshot(webhook_request(payload, signature)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn session_lookup_returns_metadata_without_writing() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_lookup",
            "payment_status": "paid",
            "metadata": {
                "clinic_id": Uuid::new_v4(),
                "user_name": "Paciente Test",
                "date": "2026-03-09",
                "time": "16:30"
            }
        })))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/session/cs_test_lookup")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["id"], "cs_test_lookup");
    assert_eq!(json_response["payment_status"], "paid");
    assert_eq!(json_response["metadata"]["user_name"], "Paciente Test");
}
