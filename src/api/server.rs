//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers;
use super::models::{ApiError, TaskStatusQuery, VideoRequest};
use crate::config::Config;
use crate::pipeline::SegmentationPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SegmentationPipeline>,
    pub config: Arc<Config>,
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/hello", get(hello_handler))
        .route("/api/test-connection", get(test_connection_handler))
        .route("/api/index-video", post(index_video_handler))
        .route("/api/segment-video", post(segment_video_handler))
        .route("/api/task-status", get(task_status_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(pipeline: Arc<SegmentationPipeline>, config: Arc<Config>) -> Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let app = build_router(AppState { pipeline, config });

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 API server listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn reply(status: StatusCode, outcome: std::result::Result<Value, ApiError>) -> Response {
    match outcome {
        Ok(data) => (status, Json(data)).into_response(),
        Err(e) => {
            let status = StatusCode::from_u16(e.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(e.body)).into_response()
        }
    }
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check()))
}

async fn hello_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::hello()))
}

/// Connection test handler
async fn test_connection_handler(State(state): State<AppState>) -> Response {
    reply(StatusCode::OK, handlers::test_connection(&state.pipeline).await)
}

/// Index video handler
async fn index_video_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = VideoRequest::from_body(&body);
    reply(StatusCode::ACCEPTED, handlers::index_video(&state.pipeline, &request).await)
}

/// Segment video handler
async fn segment_video_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = VideoRequest::from_body(&body);
    reply(StatusCode::OK, handlers::segment_video(&state.pipeline, &request).await)
}

/// Task status handler
async fn task_status_handler(
    State(state): State<AppState>,
    Query(query): Query<TaskStatusQuery>,
) -> Response {
    reply(StatusCode::OK, handlers::task_status(&state.pipeline, &query).await)
}
