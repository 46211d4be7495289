//! API module for the lecture segmenter
//!
//! Provides the REST endpoints used by the lecture front-end and the upload
//! service.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::pipeline::SegmentationPipeline;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{build_router, AppState};

/// API Server for handling REST requests
pub struct ApiServer {
    pipeline: Arc<SegmentationPipeline>,
    config: Arc<Config>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(pipeline: Arc<SegmentationPipeline>, config: Arc<Config>) -> Self {
        Self { pipeline, config }
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<()> {
        info!(
            "🚀 Starting API server on {}:{}",
            self.config.server.host, self.config.server.port
        );

        server::start_http_server(self.pipeline, self.config).await
    }
}
