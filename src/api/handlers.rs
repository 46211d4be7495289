//! API request handlers

use serde_json::Value;
use tracing::{error, info};

use super::models::{ApiError, TaskStatusQuery, VideoRequest};
use crate::indexing::submitter::validate_video_url;
use crate::pipeline::SegmentationPipeline;

/// Handle health check requests
pub fn health_check() -> Value {
    serde_json::json!({
        "status": "ok",
        "server": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Front-end proxy probe
pub fn hello() -> Value {
    serde_json::json!({ "status": "success" })
}

/// Verify the credential by listing indexes
pub async fn test_connection(pipeline: &SegmentationPipeline) -> Result<Value, ApiError> {
    match pipeline.index_count().await {
        Ok(count) => Ok(serde_json::json!({
            "status": "connected",
            "index_count": count
        })),
        Err(e) => {
            error!("❌ Connection test failed: {}", e);
            Err(ApiError::connection(e.to_string()))
        }
    }
}

/// Submit a video for indexing without waiting for the result
pub async fn index_video(pipeline: &SegmentationPipeline, request: &VideoRequest) -> Result<Value, ApiError> {
    let video_url = request
        .video_url()
        .ok_or_else(|| ApiError::bad_request("No video URL provided"))?;

    validate_video_url(video_url).map_err(|reason| ApiError::bad_request(&format!("Invalid videoUrl: {}", reason)))?;

    let lecture = request.lecture_label();
    match pipeline.start_video_indexing(video_url).await {
        Ok(task_id) => {
            info!("📤 Indexing task started: task_id={} lectureId={}", task_id, lecture);
            Ok(serde_json::json!({
                "success": true,
                "message": "Indexing task created",
                "task_id": task_id
            }))
        }
        Err(e) => {
            error!("❌ Failed to start indexing for lectureId={}: {}", lecture, e);
            Err(ApiError::from_segmenter("Failed to start indexing", &e))
        }
    }
}

/// Run the whole pipeline and return the lecture's segments
pub async fn segment_video(pipeline: &SegmentationPipeline, request: &VideoRequest) -> Result<Value, ApiError> {
    let video_url = request
        .video_url()
        .ok_or_else(|| ApiError::bad_request("videoUrl is required"))?;

    validate_video_url(video_url).map_err(|reason| ApiError::bad_request(&format!("Invalid videoUrl: {}", reason)))?;

    let lecture = request.lecture_label();
    info!("🎬 Segmentation started for lectureId={}", lecture);

    match pipeline.index_and_segment(video_url).await {
        Ok(segments) => {
            info!("✅ Segmentation finished for lectureId={} -> {} segments", lecture, segments.len());
            for (i, segment) in segments.iter().take(5).enumerate() {
                info!("[{}] {:.1} - {:.1} :: {}", i, segment.start, segment.end, segment.title);
            }

            Ok(serde_json::json!({
                "lectureId": request.record_id().cloned().unwrap_or(Value::Null),
                "segments": segments
            }))
        }
        Err(e) => {
            error!("❌ Segmentation failed for lectureId={} at {}: {}", lecture, e.stage, e.source);
            Err(ApiError::from_pipeline(&e))
        }
    }
}

/// Report the current state of an indexing task
pub async fn task_status(pipeline: &SegmentationPipeline, query: &TaskStatusQuery) -> Result<Value, ApiError> {
    let task_id = query
        .task_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("taskId is required"))?;

    match pipeline.task_status(task_id).await {
        Ok(snapshot) => Ok(serde_json::json!({
            "taskId": snapshot.task_id,
            "status": snapshot.status.as_str(),
            "assetId": snapshot.asset_id
        })),
        Err(e) => {
            error!("❌ Status lookup failed for task {}: {}", task_id, e);
            Err(ApiError::from_segmenter("Failed to retrieve task", &e))
        }
    }
}
