//! End-to-end API tests
//!
//! Drives the full router through the record lifecycle: sign-up, scan
//! analysis against a mock inference endpoint, intake submission, and
//! filtered browsing of the appended record.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use bta_common::db::init_database;
use bta_common::events::EventBus;
use bta_triage::browser::{format_confidence, format_confidence_badge, risk_label, RiskLabel};
use bta_triage::identity::{IdentityContext, LocalIdentityProvider};
use bta_triage::intake::{AnalysisHandoff, IntakeController, IntakeForm};
use bta_triage::records::RecordRepository;
use bta_triage::services::AnalysisClient;
use bta_triage::{build_router, AppState};

/// Serve a canned inference endpoint on an ephemeral port
async fn spawn_mock_endpoint(reply: Value) -> String {
    let app = Router::new().route(
        "/predict",
        post(move || {
            let reply = reply.clone();
            async move { Json(reply) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/predict", addr)
}

async fn setup_app(endpoint_url: String) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = init_database(&dir.path().join("bta.db")).await.unwrap();
    let bus = EventBus::new(100);

    let provider = LocalIdentityProvider::new(db.clone());
    let identity = Arc::new(IdentityContext::new(provider, db.clone(), bus.clone()));
    let analysis = Arc::new(AnalysisClient::new(endpoint_url).unwrap());
    let repository = Arc::new(RecordRepository::new(db.clone(), bus.clone()));
    let handoff = Arc::new(AnalysisHandoff::new());
    let intake = Arc::new(tokio::sync::Mutex::new(IntakeController::new(
        identity.subscribe(),
        repository.clone(),
    )));

    let state = AppState {
        db,
        bus,
        identity,
        analysis,
        repository,
        handoff,
        intake,
    };
    (build_router(state), dir)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn signup_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": "secret1",
        "profile": { "name": "Jane Doe", "mobile": "555-0100", "email": email },
    })
}

#[tokio::test]
#[serial]
async fn test_health_endpoint() {
    let (app, _dir) = setup_app("http://127.0.0.1:1/predict".to_string()).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bta-triage");
}

#[tokio::test]
#[serial]
async fn test_record_endpoints_require_a_session() {
    let (app, _dir) = setup_app("http://127.0.0.1:1/predict".to_string()).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/records").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/records/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_signup_conflicts_and_weak_passwords() {
    let (app, _dir) = setup_app("http://127.0.0.1:1/predict".to_string()).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/signup", signup_body("jane@example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/signup", signup_body("jane@example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut weak = signup_body("other@example.com");
    weak["password"] = json!("short");
    let response = app
        .oneshot(json_request("POST", "/api/auth/signup", weak))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Password should be at least 6 characters");
}

#[tokio::test]
#[serial]
async fn test_submit_without_analysis_routes_back_to_upload() {
    let (app, _dir) = setup_app("http://127.0.0.1:1/predict".to_string()).await;

    app.clone()
        .oneshot(json_request("POST", "/api/auth/signup", signup_body("jane@example.com")))
        .await
        .unwrap();

    let form = serde_json::to_value(IntakeForm::default()).unwrap();
    let response = app
        .oneshot(json_request("POST", "/api/records", form))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["redirect"], "/upload");
}

#[tokio::test]
#[serial]
async fn test_full_record_lifecycle() {
    let endpoint = spawn_mock_endpoint(json!({
        "result": "Glioma Tumor",
        "confidence": 92.3,
    }))
    .await;
    let (app, _dir) = setup_app(endpoint).await;

    // Sign up
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/signup", signup_body("jane@example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Analyze a scan
    let scan_dir = tempfile::tempdir().unwrap();
    let scan = scan_dir.path().join("scan.jpg");
    std::fs::write(&scan, b"fake scan bytes").unwrap();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/analyze", json!({ "path": scan })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["result"], "Glioma Tumor");
    assert_eq!(body["confidence"], 92.3);

    // Fill the demographic fields and submit
    let mut form = IntakeForm::default();
    form.fullname = "Jane Doe".to_string();
    form.email = "jane@example.com".to_string();
    form.patient_id = "PT-1001".to_string();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/records",
            serde_json::to_value(&form).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // The new record is first in the list
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/records").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["fullname"], "Jane Doe");
    assert_eq!(records[0]["result"], "Glioma Tumor");

    // Display derivations for the stored confidence
    let confidence = records[0]["confidence"].as_f64().unwrap();
    assert_eq!(risk_label(confidence), RiskLabel::TumorSuspected);
    assert_eq!(risk_label(confidence).as_str(), "Tumor suspected");
    assert_eq!(format_confidence_badge(confidence), "92%");
    assert_eq!(format_confidence(confidence), "92.30%");

    // Search filters apply server-side
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/records?search=jane")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/records?category=Glioma%20Tumor")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/records?category=Meningioma%20Tumor")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body["records"].as_array().unwrap().is_empty());
}
