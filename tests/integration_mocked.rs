/// Integration tests with a mocked Graph API
/// Tests the complete purchase flow, from HTTP intake to Conversions API, without hitting Meta
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_capi_api::config::Config;
use rust_capi_api::errors::PipelineError;
use rust_capi_api::handlers::{build_router, AppState, MAX_BODY_BYTES};
use rust_capi_api::identity::sha256_hex;
use rust_capi_api::lead_models::RawLead;
use rust_capi_api::pipeline::PurchasePipeline;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{any, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PIXEL_ID: &str = "1234567890";
const ACCESS_TOKEN: &str = "test_access_token";
const ADMIN_TOKEN: &str = "admin_secret";

/// Helper function to create test config
fn create_test_config(graph_base_url: String) -> Config {
    Config {
        port: 8080,
        meta_pixel_id: Some(PIXEL_ID.to_string()),
        meta_access_token: Some(ACCESS_TOKEN.to_string()),
        admin_token: Some(ADMIN_TOKEN.to_string()),
        graph_base_url,
        graph_api_version: "v19.0".to_string(),
        request_timeout_secs: 5,
        whatsapp_fallback_phone: "5492235568815".to_string(),
    }
}

fn create_app(config: Config) -> Router {
    build_router(Arc::new(AppState::new(config).unwrap()))
}

fn purchase_request(auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/meta-purchase")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = auth {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn events_endpoint() -> String {
    format!("/v19.0/{}/events", PIXEL_ID)
}

#[tokio::test]
async fn test_pipeline_posts_hashed_purchase() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(events_endpoint()))
        .and(query_param("access_token", ACCESS_TOKEN))
        .and(body_partial_json(json!({
            "data": [{
                "event_name": "Purchase",
                "event_id": "contact_42",
                "action_source": "system_generated",
                "custom_data": {"currency": "ARS", "value": 500.0},
                "user_data": {
                    "ph": [sha256_hex("5491123456789")],
                    "fn": [sha256_hex("ana")],
                    "ln": [sha256_hex("")],
                    "fbp": "fb.1.1700000000.111",
                }
            }],
            "test_event_code": "TEST123",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events_received": 1,
            "messages": [],
            "fbtrace_id": "AbCdEf",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let pipeline = PurchasePipeline::new(&create_test_config(mock_server.uri())).unwrap();
    let lead: RawLead = serde_json::from_value(json!({
        "nombre": "Ana",
        "phone": "011 2345-6789",
        "amount": "500",
        "fbp": "fb.1.1700000000.111",
        "event_id": "contact_42",
        "test_event_code": "TEST123",
    }))
    .unwrap();

    let outcome = pipeline.process(&lead).await.unwrap();
    assert_eq!(outcome.event_id, "contact_42");
    assert_eq!(outcome.meta_response["events_received"], 1);
}

#[tokio::test]
async fn test_upstream_error_is_rejection() {
    let mock_server = MockServer::start().await;

    let meta_error = json!({
        "message": "Invalid parameter",
        "type": "OAuthException",
        "code": 100,
        "fbtrace_id": "XyZ",
    });

    Mock::given(method("POST"))
        .and(path(events_endpoint()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": meta_error })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let pipeline = PurchasePipeline::new(&create_test_config(mock_server.uri())).unwrap();
    let lead: RawLead =
        serde_json::from_value(json!({"nombre": "Ana", "phone": "1123456789", "amount": 10}))
            .unwrap();

    match pipeline.process(&lead).await {
        Err(PipelineError::UpstreamRejection(detail)) => assert_eq!(detail, meta_error),
        other => panic!("expected upstream rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_response_is_unexpected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&mock_server)
        .await;

    let pipeline = PurchasePipeline::new(&create_test_config(mock_server.uri())).unwrap();
    let lead: RawLead =
        serde_json::from_value(json!({"nombre": "Ana", "phone": "1123456789", "amount": 10}))
            .unwrap();

    assert!(matches!(
        pipeline.process(&lead).await,
        Err(PipelineError::Unexpected(_))
    ));
}

#[tokio::test]
async fn test_hung_upstream_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"events_received": 1}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = Config {
        request_timeout_secs: 1,
        ..create_test_config(mock_server.uri())
    };
    let pipeline = PurchasePipeline::new(&config).unwrap();
    let lead: RawLead =
        serde_json::from_value(json!({"nombre": "Ana", "phone": "1123456789", "amount": 10}))
            .unwrap();

    match pipeline.process(&lead).await {
        Err(PipelineError::Unexpected(msg)) => assert!(!msg.contains(ACCESS_TOKEN)),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_endpoint_success_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(events_endpoint()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events_received": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_app(create_test_config(mock_server.uri()));
    let response = app
        .oneshot(purchase_request(
            Some(ADMIN_TOKEN),
            json!({"nombre": "Ana", "phone": "01123456789", "amount": "500", "fbc": "abc"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["metaResponse"]["events_received"], 1);

    let event_id = body["event_id"].as_str().unwrap();
    let expected_suffix = &sha256_hex("5491123456789")[..5];
    assert!(event_id.starts_with("purchase_"));
    assert!(event_id.ends_with(expected_suffix));
}

#[tokio::test]
async fn test_endpoint_upstream_rejection_is_400() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"message": "Invalid OAuth access token"}})),
        )
        .mount(&mock_server)
        .await;

    let app = create_app(create_test_config(mock_server.uri()));
    let response = app
        .oneshot(purchase_request(
            Some(ADMIN_TOKEN),
            json!({"nombre": "Ana", "phone": "1123456789", "amount": 500}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["metaError"]["message"], "Invalid OAuth access token");
}

#[tokio::test]
async fn test_endpoint_requires_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    for auth in [None, Some("wrong")] {
        let app = create_app(create_test_config(mock_server.uri()));
        // Invalid body too: auth is checked first
        let response = app
            .oneshot(purchase_request(auth, json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["success"], false);
    }
}

#[tokio::test]
async fn test_endpoint_validation_skips_network() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    for body in [
        json!({"phone": "1123456789", "amount": "500"}),
        json!({"nombre": "Ana", "amount": "500"}),
        json!({"nombre": "Ana", "phone": "1123456789"}),
        json!({"nombre": "Ana", "phone": "1123456789", "amount": "abc"}),
    ] {
        let app = create_app(create_test_config(mock_server.uri()));
        let response = app
            .oneshot(purchase_request(Some(ADMIN_TOKEN), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_endpoint_missing_meta_config_is_500() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = Config {
        meta_access_token: None,
        ..create_test_config(mock_server.uri())
    };
    let response = create_app(config)
        .oneshot(purchase_request(
            Some(ADMIN_TOKEN),
            json!({"nombre": "Ana", "phone": "1123456789", "amount": 500}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["success"], false);
}

fn oversized_purchase_body() -> String {
    json!({
        "nombre": "Ana",
        "phone": "1123456789",
        "amount": 500,
        "notes": "x".repeat(MAX_BODY_BYTES),
    })
    .to_string()
}

#[tokio::test]
async fn test_endpoint_oversized_streamed_body_is_413() {
    let mock_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events_received": 1})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = create_app(create_test_config(mock_server.uri()));
    // No Content-Length: the limit trips while the handler buffers the body
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/meta-purchase")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .body(Body::from(oversized_purchase_body()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
async fn test_endpoint_oversized_declared_body_is_413() {
    let app = create_app(create_test_config("http://127.0.0.1:9".to_string()));
    let body = oversized_purchase_body();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/meta-purchase")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_endpoint_rejects_other_methods() {
    let app = create_app(create_test_config("http://127.0.0.1:9".to_string()));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/meta-purchase")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_app(create_test_config("http://127.0.0.1:9".to_string()));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/meta-purchase")
                .header(header::ORIGIN, "https://hook.make.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_whatsapp_redirect() {
    let app = create_app(create_test_config("http://127.0.0.1:9".to_string()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/ir?utm_campaign=PROSPECTING&utm_content=VideoKun")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        "https://wa.me/5492235568815?text=Hola%21%20Quiero%20mi%20usuario%20%28Ref%3A%20PROSPECTING%20%7C%20VideoKun%29"
    );
}

#[tokio::test]
async fn test_whatsapp_redirect_survives_malformed_query() {
    let app = create_app(create_test_config("http://127.0.0.1:9".to_string()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/ir?phone=5491111111111&phone=5492222222222")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://wa.me/5492235568815"
    );
}

#[tokio::test]
async fn test_health() {
    let app = create_app(Config::default());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}
