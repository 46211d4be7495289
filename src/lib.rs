//! Lecture Segmenter
//!
//! Submits lecture videos to a video-understanding indexing service, tracks
//! the indexing task until it settles, and turns the service's analysis output
//! into a clean, chronological list of titled segments for the lecture player.

pub mod config;
pub mod error;
pub mod indexing;
pub mod segments;
pub mod pipeline;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{PipelineError, PipelineStage, SegmenterError, ServiceError};
pub use crate::indexing::{
    verify_index_configuration, Clock, IndexConfig, IndexingPoller, IndexingSubmitter, TaskSnapshot,
    TaskStatus, TokioClock, TwelveLabsClient, VideoIndexService,
};
pub use crate::pipeline::SegmentationPipeline;
pub use crate::segments::{Segment, SegmentList, SegmentSynthesizer};
