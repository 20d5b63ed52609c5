//! HTTP surface: status codes and response bodies.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use fraudscore::registry::{InMemoryRegistry, ModelRegistry, ModelUri};
use fraudscore::serving::{router, InferenceService};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn service(with_model: bool) -> Arc<InferenceService> {
    let registry = Arc::new(InMemoryRegistry::new());
    if with_model {
        let v = registry.publish(&common::constant_draft(0.02)).unwrap();
        registry.set_alias(common::MODEL_NAME, "production", v).unwrap();
    }
    let svc = Arc::new(InferenceService::new(registry, ModelUri::alias(common::MODEL_NAME, "production")));
    svc.load();
    svc
}

async fn call(app: Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn predict_body(features: Vec<f64>) -> Option<String> {
    Some(json!({ "features": features }).to_string())
}

#[tokio::test]
async fn health_reports_loaded_model() {
    let (status, body) = call(router(service(true)), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_version"], 1);
}

#[tokio::test]
async fn health_is_ok_while_degraded() {
    let (status, body) = call(router(service(false)), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["state"], "degraded");
    assert_eq!(body["last_error"], "model not found");
}

#[tokio::test]
async fn predict_without_model_is_unavailable() {
    let (status, body) = call(router(service(false)), "POST", "/predict", predict_body(common::zero_vector())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Model not loaded");
    assert_eq!(body["status"], 503);
}

#[tokio::test]
async fn predict_rejects_wrong_arity() {
    let (status, body) = call(router(service(true)), "POST", "/predict", predict_body(vec![0.0; 12])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("30"));
}

#[tokio::test]
async fn predict_rejects_malformed_json() {
    let (status, _) = call(router(service(true)), "POST", "/predict", Some("{\"features\": [1, \"x\"]}".into())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn predict_scores_valid_vector() {
    let (status, body) = call(router(service(true)), "POST", "/predict", predict_body(common::zero_vector())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_fraud"], false);
    assert!((body["fraud_probability"].as_f64().unwrap() - 0.02).abs() < 1e-9);
    assert!((body["confidence"].as_f64().unwrap() - 0.98).abs() < 1e-9);
}

#[tokio::test]
async fn reload_endpoint_reports_outcome() {
    let (status, body) = call(router(service(true)), "POST", "/admin/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "loaded");
    assert_eq!(body["version"], 1);

    let (_, body) = call(router(service(false)), "POST", "/admin/reload", None).await;
    assert_eq!(body["outcome"], "failed");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn scoring_failure_returns_opaque_500() {
    let registry = Arc::new(InMemoryRegistry::new());
    let v = registry.publish(&common::broken_draft()).unwrap();
    registry.set_alias(common::MODEL_NAME, "production", v).unwrap();
    let svc = Arc::new(InferenceService::new(registry, ModelUri::alias(common::MODEL_NAME, "production")));
    svc.load();

    let (status, body) = call(router(Arc::clone(&svc)), "POST", "/predict", predict_body(common::zero_vector())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal processing error", "status": 500 }));

    let (status, body) = call(router(svc), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_loaded"], true);
}
