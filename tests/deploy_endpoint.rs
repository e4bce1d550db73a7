//! End-to-end tests for the deploy endpoint, driven through the full router.
//!
//! The real script launcher is replaced by a recording trigger so each test
//! can assert exactly how many deployments were started and with what secret.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use deployhook::config::DeployConfig;
use deployhook::{create_router, AppState, DeployTrigger};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "vega_deploy_secret_2024";

#[derive(Default)]
struct RecordingTrigger {
    launches: Mutex<Vec<String>>,
}

impl RecordingTrigger {
    fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }
}

impl DeployTrigger for RecordingTrigger {
    fn launch(&self, secret: &str) {
        self.launches.lock().unwrap().push(secret.to_string());
    }
}

fn deploy_config() -> DeployConfig {
    DeployConfig {
        secret: SECRET.to_string(),
        script: "/opt/app/deploy.sh".into(),
        ..DeployConfig::default()
    }
}

fn app_with(config: DeployConfig) -> (Router, Arc<RecordingTrigger>) {
    let trigger = Arc::new(RecordingTrigger::default());
    let state = AppState::new(config, trigger.clone());
    (create_router(state), trigger)
}

fn app() -> (Router, Arc<RecordingTrigger>) {
    app_with(deploy_config())
}

fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn correct_secret_starts_one_deployment() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request("POST", "/deploy", r#"{"secret":"vega_deploy_secret_2024"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], br#"{"status": "deploying"}"#);
    assert_eq!(trigger.launches(), vec![SECRET.to_string()]);
}

#[tokio::test]
async fn wrong_secret_is_unauthorized() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request("POST", "/deploy", r#"{"secret":"wrong"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "error": "Unauthorized" }));
    assert!(trigger.launches().is_empty());
}

#[tokio::test]
async fn missing_or_non_string_secret_is_unauthorized() {
    for body in [r#"{}"#, r#"{"secret":null}"#, r#"{"secret":2024}"#, r#"{"token":"vega_deploy_secret_2024"}"#] {
        let (app, trigger) = app();
        let response = app.oneshot(request("POST", "/deploy", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "body: {body}");
        assert!(trigger.launches().is_empty());
    }
}

#[tokio::test]
async fn secret_prefix_is_unauthorized() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request("POST", "/deploy", r#"{"secret":"vega_deploy_secret"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(trigger.launches().is_empty());
}

#[tokio::test]
async fn invalid_json_is_bad_request() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request("POST", "/deploy", "not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "Bad Request" }));
    assert!(trigger.launches().is_empty());
}

#[tokio::test]
async fn non_object_json_is_bad_request() {
    for body in [r#"["vega_deploy_secret_2024"]"#, r#""vega_deploy_secret_2024""#, "42", "null"] {
        let (app, trigger) = app();
        let response = app.oneshot(request("POST", "/deploy", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert!(trigger.launches().is_empty());
    }
}

#[tokio::test]
async fn empty_body_is_bad_request() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request("POST", "/deploy", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(trigger.launches().is_empty());
}

#[tokio::test]
async fn invalid_utf8_is_bad_request() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request("POST", "/deploy", vec![0x7b, 0xff, 0xfe, 0x7d]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(trigger.launches().is_empty());
}

#[tokio::test]
async fn oversized_body_is_bad_request() {
    let config = DeployConfig {
        max_body_bytes: 16,
        ..deploy_config()
    };
    let (app, trigger) = app_with(config);

    let response = app
        .oneshot(request("POST", "/deploy", r#"{"secret":"vega_deploy_secret_2024"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(trigger.launches().is_empty());
}

#[tokio::test]
async fn get_on_deploy_path_is_not_found() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request("GET", "/deploy", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(trigger.launches().is_empty());
}

#[tokio::test]
async fn other_paths_are_not_found() {
    for (method, uri) in [("POST", "/other"), ("POST", "/"), ("GET", "/"), ("POST", "/deploy/extra")] {
        let (app, trigger) = app();
        let response = app
            .oneshot(request(method, uri, r#"{"secret":"vega_deploy_secret_2024"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        assert!(trigger.launches().is_empty());
    }
}

#[tokio::test]
async fn query_string_does_not_affect_routing() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request(
            "POST",
            "/deploy?ref=main",
            r#"{"secret":"vega_deploy_secret_2024"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trigger.launches().len(), 1);
}

#[tokio::test]
async fn extra_fields_are_ignored() {
    let (app, trigger) = app();

    let response = app
        .oneshot(request(
            "POST",
            "/deploy",
            r#"{"secret":"vega_deploy_secret_2024","ref":"main","force":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trigger.launches(), vec![SECRET.to_string()]);
}

#[tokio::test]
async fn repeated_triggers_each_start_a_deployment() {
    let (app, trigger) = app();

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(request("POST", "/deploy", r#"{"secret":"vega_deploy_secret_2024"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(trigger.launches().len(), 3);
}

#[tokio::test]
async fn custom_deploy_path_is_honoured() {
    let config = DeployConfig {
        path: "/hooks/erp".to_string(),
        ..deploy_config()
    };
    let (app, trigger) = app_with(config);

    let response = app
        .clone()
        .oneshot(request("POST", "/deploy", r#"{"secret":"vega_deploy_secret_2024"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request("POST", "/hooks/erp", r#"{"secret":"vega_deploy_secret_2024"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trigger.launches().len(), 1);
}

#[tokio::test]
async fn responses_carry_request_id_and_no_store() {
    for body in [r#"{"secret":"vega_deploy_secret_2024"}"#, r#"{"secret":"wrong"}"#] {
        let (app, _trigger) = app();
        let response = app.oneshot(request("POST", "/deploy", body)).await.unwrap();

        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        let request_id = response
            .headers()
            .get("x-request-id")
            .expect("x-request-id header")
            .to_str()
            .unwrap();
        assert!(uuid::Uuid::parse_str(request_id).is_ok());
    }
}

#[tokio::test]
async fn not_found_also_carries_request_id() {
    let (app, _trigger) = app();

    let response = app
        .oneshot(request("POST", "/other", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));
}
