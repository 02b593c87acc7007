#![allow(dead_code)]

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chat_service::config::ModelSettings;
use chat_service::services::providers::mock::MockProvider;
use chat_service::services::ModelResolver;
use chat_service::startup::{build_router, AppState};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

/// Fixed candidate list, no discovery.
pub fn fixed_models(models: &[&str]) -> ModelSettings {
    ModelSettings {
        discovery: false,
        fallback_models: models.iter().map(|m| m.to_string()).collect(),
        ..ModelSettings::default()
    }
}

pub fn app_with(provider: Arc<MockProvider>, settings: ModelSettings) -> Router {
    let resolver = ModelResolver::new(provider, settings);
    build_router(AppState::new(Some(resolver), static_dir()))
}

/// Router as built when `GEMINI_API_KEY` is missing.
pub fn app_without_key() -> Router {
    build_router(AppState::new(None, static_dir()))
}

pub async fn post_chat(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).expect("chat responses are JSON");
    (status, json)
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes)
}
