//! Indexing lifecycle against the external video-understanding service
//!
//! The service is reached through the [`VideoIndexService`] trait so the
//! verifier, submitter, poller and synthesizer can run against the real HTTP
//! client or a scripted stand-in.

pub mod client;
pub mod poller;
pub mod submitter;
pub mod verifier;

pub use client::TwelveLabsClient;
pub use poller::{Clock, IndexingPoller, IndexingState, PollAction, TokioClock};
pub use submitter::IndexingSubmitter;
pub use verifier::verify_index_configuration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::EngineConfig;
use crate::error::ServiceError;

/// Verified index shared read-only by every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub index_id: String,
    pub name: String,
    /// Capability tags in `model:option` form
    pub required_engines: BTreeSet<String>,
}

/// Index as listed by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub index_id: String,
    pub name: String,
    pub engines: Vec<EngineConfig>,
}

impl IndexInfo {
    pub fn capabilities(&self) -> BTreeSet<String> {
        self.engines
            .iter()
            .flat_map(|engine| engine.capability_tags())
            .collect()
    }
}

/// Request to create a new index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub engines: Vec<EngineConfig>,
}

/// Task status as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Indexing,
    Ready,
    Failed,
}

impl TaskStatus {
    /// Map a raw status string onto the lifecycle; unknown values stay non-terminal
    pub fn from_service(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ready" => TaskStatus::Ready,
            "failed" | "error" => TaskStatus::Failed,
            "indexing" => TaskStatus::Indexing,
            "validating" | "pending" | "queued" => TaskStatus::Pending,
            other => {
                tracing::warn!("Unknown task status '{}', treating as pending", other);
                TaskStatus::Pending
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Ready | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Indexing => "indexing",
            TaskStatus::Ready => "ready",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of an indexing task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub asset_id: Option<String>,
}

/// Analysis request issued against an indexed asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisQuery {
    /// Structured chapter extraction with timestamps and titles
    Chapters,
    /// Open-ended prompt; the answer is free text
    Prompt(String),
}

impl AnalysisQuery {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisQuery::Chapters => "chapters",
            AnalysisQuery::Prompt(_) => "prompt",
        }
    }
}

/// External indexing/analysis collaborator
#[async_trait]
pub trait VideoIndexService: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, ServiceError>;
    async fn create_index(&self, spec: &IndexSpec) -> Result<String, ServiceError>;
    async fn submit_task(&self, index_id: &str, video_url: &str) -> Result<String, ServiceError>;
    async fn get_task(&self, task_id: &str) -> Result<TaskSnapshot, ServiceError>;
    async fn analyze(
        &self,
        asset_id: &str,
        query: &AnalysisQuery,
    ) -> Result<serde_json::Value, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(TaskStatus::from_service("ready"), TaskStatus::Ready);
        assert_eq!(TaskStatus::from_service("READY"), TaskStatus::Ready);
        assert_eq!(TaskStatus::from_service("failed"), TaskStatus::Failed);
        assert_eq!(TaskStatus::from_service("indexing"), TaskStatus::Indexing);
        assert_eq!(TaskStatus::from_service("validating"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_service("queued"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_service("something-new"), TaskStatus::Pending);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Ready.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Indexing.is_terminal());
    }

    #[test]
    fn test_index_capabilities() {
        let info = IndexInfo {
            index_id: "idx".to_string(),
            name: "lectures".to_string(),
            engines: vec![
                EngineConfig::new("marengo2.7", &["visual"]),
                EngineConfig::new("pegasus1.2", &["visual", "audio"]),
            ],
        };
        let caps = info.capabilities();
        assert_eq!(caps.len(), 3);
        assert!(caps.contains("marengo2.7:visual"));
        assert!(!caps.contains("marengo2.7:audio"));
    }
}
