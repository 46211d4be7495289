use super::{IndexConfig, VideoIndexService};
use crate::error::{Result, SegmenterError};
use std::sync::Arc;
use tracing::{error, info};

/// Fire-and-forget submission of indexing tasks.
///
/// Holds no per-video state: every call creates a new task and the caller
/// correlates the returned id with its own records.
#[derive(Clone)]
pub struct IndexingSubmitter {
    service: Arc<dyn VideoIndexService>,
    index: Arc<IndexConfig>,
}

impl IndexingSubmitter {
    pub fn new(service: Arc<dyn VideoIndexService>, index: Arc<IndexConfig>) -> Self {
        Self { service, index }
    }

    pub fn index(&self) -> &IndexConfig {
        &self.index
    }

    /// Submit `video_url` for indexing and return the task id.
    ///
    /// A single attempt; failures are logged and returned, never retried.
    pub async fn start_video_indexing(&self, video_url: &str) -> Result<String> {
        let video_url = video_url.trim();

        if let Err(reason) = validate_video_url(video_url) {
            error!("❌ Rejected video URL '{}': {}", video_url, reason);
            return Err(SegmenterError::Submission(reason));
        }

        if self.index.index_id.is_empty() {
            error!("❌ No index resolved for '{}'", self.index.name);
            return Err(SegmenterError::Submission(format!(
                "index '{}' is not resolved",
                self.index.name
            )));
        }

        match self.service.submit_task(&self.index.index_id, video_url).await {
            Ok(task_id) if !task_id.trim().is_empty() => {
                info!("📤 Indexing task {} created in index {}", task_id, self.index.index_id);
                Ok(task_id)
            }
            Ok(_) => {
                error!("❌ Service returned an empty task id for {}", video_url);
                Err(SegmenterError::Submission("service returned an empty task id".to_string()))
            }
            Err(e) => {
                error!("❌ Failed to submit indexing task for {}: {}", video_url, e);
                Err(SegmenterError::Submission(e.to_string()))
            }
        }
    }
}

/// Local well-formedness check; reachability is left to the service
pub fn validate_video_url(video_url: &str) -> std::result::Result<(), String> {
    if video_url.is_empty() {
        return Err("video URL is empty".to_string());
    }

    let parsed = url::Url::parse(video_url).map_err(|e| format!("malformed video URL: {}", e))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported URL scheme '{}'", other)),
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("video URL has no host".to_string());
    }

    Ok(())
}
