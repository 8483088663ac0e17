//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::Config;
use crate::error::UploadError;
use crate::pipeline::UploadPipeline;
use super::handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UploadPipeline>,
    pub config: Arc<Config>,
}

/// Configure and start the HTTP server
pub async fn start_http_server(pipeline: Arc<UploadPipeline>, config: Arc<Config>) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let max_upload_bytes = config.server.max_upload_bytes;

    let app = build_router(AppState { pipeline, config }, max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("API server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub fn build_router(state: AppState, max_upload_bytes: u64) -> Router {
    // Allow browser access from the upload page or any frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes as usize))
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check().await))
}

/// Upload handler
async fn upload_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    match handlers::handle_upload(&state.pipeline, max_upload_bytes, multipart).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// Map an upload error to its JSON error payload
fn error_response(error: &UploadError) -> (StatusCode, Json<serde_json::Value>) {
    (
        error.status(),
        Json(serde_json::json!({ "error": error.to_string() })),
    )
}

/// Serve a minimal upload page
async fn index_handler() -> impl IntoResponse {
    let html = r#"<!DOCTYPE html>
<html>
<head>
    <title>vidscribe</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; max-width: 560px; }
        label { display: block; margin: 10px 0 4px; }
        button { margin-top: 14px; }
    </style>
</head>
<body>
    <h1>vidscribe</h1>
    <p>Upload a video to transcribe it and archive one frame per second.</p>
    <form action="/upload" method="post" enctype="multipart/form-data">
        <label for="name">Name</label>
        <input type="text" id="name" name="name" required>
        <label for="phone">Phone</label>
        <input type="text" id="phone" name="phone" required>
        <label for="video">Video</label>
        <input type="file" id="video" name="video" accept="video/*" required>
        <button type="submit">Upload</button>
    </form>
</body>
</html>
"#;

    Html(html)
}
