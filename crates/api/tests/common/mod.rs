//! Shared helpers for API integration tests.
//!
//! Builds the full application router with the production middleware
//! stack so tests exercise exactly what `main.rs` serves.

// Each integration test binary compiles this module separately and uses
// a different subset of helpers.
#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mediasift_api::config::ServerConfig;
use mediasift_api::router::build_app_router;
use mediasift_api::state::AppState;

/// Build a test `ServerConfig` rooted at a temp directory.
///
/// The ComfyUI URL points at a closed local port so any accidental
/// network call fails fast instead of hanging.
pub fn test_config(media_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        comfyui_url: "http://127.0.0.1:9".to_string(),
        media_root: media_root.to_path_buf(),
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(media_root: &Path) -> Router {
    let config = test_config(media_root);
    let state = AppState::new(config.clone());
    build_app_router(state, &config)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a POST request with a JSON body against the app.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Write a minimal PNG carrying a ComfyUI `prompt` tEXt chunk.
pub fn write_png_with_workflow(dir: &Path, name: &str, prompt: &serde_json::Value) {
    let mut bytes: Vec<u8> = b"\x89PNG\r\n\x1a\n".to_vec();

    let mut data = b"prompt".to_vec();
    data.push(0);
    data.extend_from_slice(prompt.to_string().as_bytes());
    bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
    bytes.extend_from_slice(b"tEXt");
    bytes.extend_from_slice(&data);
    bytes.extend_from_slice(&[0, 0, 0, 0]);

    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(b"IEND");
    bytes.extend_from_slice(&[0, 0, 0, 0]);

    std::fs::write(dir.join(name), bytes).unwrap();
}
