use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{PipelineError, PipelineStage, Result, SegmenterError, ServiceError};
use crate::indexing::{
    Clock, IndexConfig, IndexingPoller, IndexingSubmitter, TaskSnapshot, VideoIndexService,
};
use crate::segments::{SegmentList, SegmentSynthesizer};

/// Composes submission, polling and synthesis for one video at a time.
///
/// Holds only read-only, process-wide state (service handle, verified index,
/// settings); concurrent invocations share nothing mutable.
#[derive(Clone)]
pub struct SegmentationPipeline {
    service: Arc<dyn VideoIndexService>,
    submitter: IndexingSubmitter,
    poller: IndexingPoller,
    synthesizer: SegmentSynthesizer,
}

impl SegmentationPipeline {
    pub fn new(
        service: Arc<dyn VideoIndexService>,
        index: Arc<IndexConfig>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!("🔧 Pipeline ready for index '{}' ({})", index.name, index.index_id);

        Self {
            submitter: IndexingSubmitter::new(service.clone(), index),
            poller: IndexingPoller::new(service.clone(), clock, config.polling.clone()),
            synthesizer: SegmentSynthesizer::new(service.clone(), config.segmentation.clone()),
            service,
        }
    }

    pub fn index(&self) -> &IndexConfig {
        self.submitter.index()
    }

    /// Submit a video and return the task id without waiting
    pub async fn start_video_indexing(&self, video_url: &str) -> Result<String> {
        self.submitter.start_video_indexing(video_url).await
    }

    /// Current state of a previously submitted task
    pub async fn task_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.poller.task_status(task_id).await
    }

    /// Number of indexes visible with the configured credential
    pub async fn index_count(&self) -> std::result::Result<usize, ServiceError> {
        Ok(self.service.list_indexes().await?.len())
    }

    /// Submit, wait for indexing and synthesize segments in one call
    pub async fn index_and_segment(&self, video_url: &str) -> std::result::Result<SegmentList, PipelineError> {
        let started = Instant::now();

        let task_id = self
            .submitter
            .start_video_indexing(video_url)
            .await
            .map_err(|e| stage_failed(PipelineStage::Submit, e))?;

        let asset_id = self
            .poller
            .poll_until_ready(&task_id)
            .await
            .map_err(|e| stage_failed(PipelineStage::Poll, e))?;

        let segments = self
            .synthesizer
            .synthesize_segments(&asset_id)
            .await
            .map_err(|e| stage_failed(PipelineStage::Synthesize, e))?;

        info!(
            "🎉 Segmented task {} into {} segments in {:.1}s",
            task_id,
            segments.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(segments)
    }
}

fn stage_failed(stage: PipelineStage, source: SegmenterError) -> PipelineError {
    warn!("Pipeline stage {} failed ({}): {}", stage, source.code(), source);
    PipelineError::new(stage, source)
}
