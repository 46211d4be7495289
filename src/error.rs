//! Error types for indexing, polling and segmentation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for segmenter operations
pub type Result<T> = std::result::Result<T, SegmenterError>;

/// Failures reported by the external indexing/analysis service
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Service API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid service response: {0}")]
    InvalidResponse(String),

    #[error("Missing API credential")]
    MissingCredential,
}

impl ServiceError {
    /// Whether a retry of the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Network(_) => true,
            ServiceError::Api { status, .. } => *status == 429 || *status >= 500,
            ServiceError::InvalidResponse(_) | ServiceError::MissingCredential => false,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            ServiceError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

/// Error taxonomy for the indexing lifecycle and segmentation
#[derive(thiserror::Error, Debug)]
pub enum SegmenterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to submit indexing task: {0}")]
    Submission(String),

    #[error("Indexing task {task_id} failed: {reason}")]
    IndexingFailed { task_id: String, reason: String },

    #[error("Indexing task {task_id} did not finish within {waited_secs}s")]
    IndexingTimeout { task_id: String, waited_secs: u64 },

    #[error("Polling task {task_id} failed after {attempts} attempt(s): {source}")]
    PollFailed {
        task_id: String,
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    #[error("Analysis query failed: {0}")]
    AnalysisQuery(#[source] ServiceError),

    #[error("No valid segments for asset {asset_id} ({discarded} entries discarded)")]
    EmptySegmentation { asset_id: String, discarded: usize },
}

impl SegmenterError {
    /// Stable, machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            SegmenterError::Configuration(_) => "configuration_error",
            SegmenterError::Submission(_) => "submission_error",
            SegmenterError::IndexingFailed { .. } => "indexing_failed",
            SegmenterError::IndexingTimeout { .. } => "indexing_timeout",
            SegmenterError::PollFailed { .. } => "poll_error",
            SegmenterError::AnalysisQuery(_) => "analysis_query_error",
            SegmenterError::EmptySegmentation { .. } => "empty_segmentation",
        }
    }
}

/// Stage of `index_and_segment` at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Submit,
    Poll,
    Synthesize,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Submit => "submit",
            PipelineStage::Poll => "poll",
            PipelineStage::Synthesize => "synthesize",
        };
        f.write_str(name)
    }
}

/// Failure of the synchronous pipeline, tagged with its stage
#[derive(thiserror::Error, Debug)]
#[error("Pipeline failed during {stage}: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: SegmenterError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: SegmenterError) -> Self {
        Self { stage, source }
    }

    pub fn code(&self) -> &'static str {
        self.source.code()
    }
}
