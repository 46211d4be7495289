//! API data models

use serde::Deserialize;
use serde_json::Value;

use crate::error::{PipelineError, SegmenterError};

/// Body of `/api/index-video` and `/api/segment-video`
#[derive(Debug, Default, Deserialize)]
pub struct VideoRequest {
    #[serde(rename = "videoUrl", default)]
    pub video_url: Option<String>,

    /// Caller's record id, echoed back untouched
    #[serde(rename = "lectureId", default)]
    pub lecture_id: Option<Value>,

    /// Record id as sent by the upload service
    #[serde(rename = "trainingSessionId", default)]
    pub training_session_id: Option<Value>,
}

impl VideoRequest {
    /// Lenient parse: an unreadable body behaves like an empty one
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Trimmed, non-empty video URL
    pub fn video_url(&self) -> Option<&str> {
        self.video_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// `lectureId`, falling back to `trainingSessionId`
    pub fn record_id(&self) -> Option<&Value> {
        self.lecture_id
            .as_ref()
            .filter(|id| !id.is_null())
            .or(self.training_session_id.as_ref())
    }

    pub fn lecture_label(&self) -> String {
        match self.record_id() {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => "-".to_string(),
        }
    }
}

/// Query string of `/api/task-status`
#[derive(Debug, Default, Deserialize)]
pub struct TaskStatusQuery {
    #[serde(rename = "taskId", default)]
    pub task_id: Option<String>,
}

/// Error reply: HTTP status plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub body: Value,
}

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: 400,
            body: serde_json::json!({ "error": message }),
        }
    }

    pub fn from_segmenter(context: &str, err: &SegmenterError) -> Self {
        Self {
            status: 500,
            body: serde_json::json!({
                "error": format!("{}: {}", context, err),
                "code": err.code(),
            }),
        }
    }

    pub fn from_pipeline(err: &PipelineError) -> Self {
        Self {
            status: 500,
            body: serde_json::json!({
                "error": err.source.to_string(),
                "code": err.code(),
                "stage": err.stage,
            }),
        }
    }

    pub fn connection(message: String) -> Self {
        Self {
            status: 500,
            body: serde_json::json!({ "status": "error", "message": message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_request_aliases() {
        let request = VideoRequest::from_body(br#"{"videoUrl":" https://x/v.mp4 ","trainingSessionId":"S1"}"#);
        assert_eq!(request.video_url(), Some("https://x/v.mp4"));
        assert_eq!(request.lecture_label(), "S1");

        let numeric = VideoRequest::from_body(br#"{"videoUrl":"https://x/v.mp4","lectureId":7}"#);
        assert_eq!(numeric.record_id(), Some(&Value::from(7)));
    }

    #[test]
    fn test_unreadable_body_is_empty_request() {
        let request = VideoRequest::from_body(b"not json");
        assert!(request.video_url().is_none());
        assert!(request.record_id().is_none());

        let blank = VideoRequest::from_body(br#"{"videoUrl":"   "}"#);
        assert!(blank.video_url().is_none());
    }
}
