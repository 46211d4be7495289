#![cfg(feature = "api")]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use lecture_segmenter::api::{build_router, AppState};
use lecture_segmenter::ServiceError;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router(service: Arc<ScriptedService>) -> Router {
    let config = test_config();
    let (pipeline, _clock) = pipeline_with(service, &config);
    build_router(AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = send(router(Arc::new(ScriptedService::new())), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"], "lecture-segmenter");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_hello_endpoint() {
    let (status, body) = send(router(Arc::new(ScriptedService::new())), get("/api/hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success"}));
}

#[tokio::test]
async fn test_segment_video_returns_sorted_segments() {
    let service = Arc::new(
        ScriptedService::new()
            .with_task_script(vec![indexing(), ready("asset-1")])
            .with_analysis(vec![Ok(three_chapters_one_inverted())]),
    );

    let (status, body) = send(
        router(service),
        post_json("/api/segment-video", r#"{"videoUrl":"https://x/v.mp4","lectureId":"L1"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lectureId"], "L1");
    assert_eq!(
        body["segments"],
        json!([
            {"start": 0.0, "end": 95.0, "title": "Work and power"},
            {"start": 95.0, "end": 240.0, "title": "Conservation of energy"}
        ])
    );
}

#[tokio::test]
async fn test_segment_video_accepts_training_session_id() {
    let service = Arc::new(
        ScriptedService::new()
            .with_task_script(vec![ready("asset-1")])
            .with_analysis(vec![Ok(three_chapters_one_inverted())]),
    );

    let (status, body) = send(
        router(service),
        post_json("/api/segment-video", r#"{"videoUrl":"https://x/v.mp4","trainingSessionId":42}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lectureId"], 42);
}

#[tokio::test]
async fn test_segment_video_requires_url() {
    let service = Arc::new(ScriptedService::new());

    for payload in [r#"{"videoUrl":"","lectureId":"L1"}"#, r#"{"lectureId":"L1"}"#, "garbage"] {
        let (status, body) = send(router(service.clone()), post_json("/api/segment-video", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["error"], "videoUrl is required");
    }
    assert_eq!(service.submission_count(), 0);
}

#[tokio::test]
async fn test_segment_video_timeout_and_failure_codes() {
    let stuck = Arc::new(ScriptedService::new().with_task_script(vec![indexing()]));
    let (status, timeout) = send(
        router(stuck),
        post_json("/api/segment-video", r#"{"videoUrl":"https://x/v.mp4"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(timeout["code"], "indexing_timeout");
    assert_eq!(timeout["stage"], "poll");

    let dead = Arc::new(ScriptedService::new().with_task_script(vec![failed()]));
    let (status, failure) = send(
        router(dead),
        post_json("/api/segment-video", r#"{"videoUrl":"https://x/v.mp4"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failure["code"], "indexing_failed");
}

#[tokio::test]
async fn test_index_video_accepted() {
    let service = Arc::new(ScriptedService::new());

    let (status, body) = send(
        router(service.clone()),
        post_json("/api/index-video", r#"{"videoUrl":"https://x/v.mp4","lectureId":"L1"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    assert_eq!(body["task_id"], "task-1");
    // fire-and-forget: nothing is polled
    assert_eq!(service.task_query_count(), 0);
}

#[tokio::test]
async fn test_index_video_rejects_missing_and_invalid_urls() {
    let service = Arc::new(ScriptedService::new());

    let (status, body) = send(router(service.clone()), post_json("/api/index-video", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No video URL provided");

    let (status, body) = send(
        router(service.clone()),
        post_json("/api/index-video", r#"{"videoUrl":"ftp://x/v.mp4"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid videoUrl"));
    assert_eq!(service.submission_count(), 0);
}

#[tokio::test]
async fn test_index_video_service_rejection() {
    let service = Arc::new(ScriptedService::new().with_submit_error(ServiceError::Api {
        status: 400,
        message: "unsupported".to_string(),
    }));

    let (status, body) = send(
        router(service),
        post_json("/api/index-video", r#"{"videoUrl":"https://x/v.mp4"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "submission_error");
    assert!(body["error"].as_str().unwrap().starts_with("Failed to start indexing"));
}

#[tokio::test]
async fn test_task_status_endpoint() {
    let service = Arc::new(ScriptedService::new().with_task_script(vec![ready("asset-9")]));

    let (status, body) = send(router(service.clone()), get("/api/task-status")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "taskId is required");

    let (status, body) = send(router(service), get("/api/task-status?taskId=task-5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"taskId": "task-5", "status": "ready", "assetId": "asset-9"}));
}

#[tokio::test]
async fn test_task_status_lookup_failure() {
    let service = Arc::new(ScriptedService::new().with_task_script(vec![Err(ServiceError::Api {
        status: 404,
        message: "task not found".to_string(),
    })]));

    let (status, body) = send(router(service.clone()), get("/api/task-status?taskId=missing")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "poll_error");
    assert!(body["error"].as_str().unwrap().starts_with("Failed to retrieve task"));
    assert_eq!(service.task_query_count(), 1);
}

#[tokio::test]
async fn test_connection_endpoint() {
    let service = Arc::new(ScriptedService::new().with_index(lecture_index("idx-1", "lectures")));
    let (status, body) = send(router(service), get("/api/test-connection")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "connected", "index_count": 1}));

    let broken = Arc::new(ScriptedService::new().with_list_error(ServiceError::Api {
        status: 401,
        message: "invalid api key".to_string(),
    }));
    let (status, body) = send(router(broken), get("/api/test-connection")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("invalid api key"));
}
