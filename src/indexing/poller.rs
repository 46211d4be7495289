//! Task polling as an explicit state machine
//!
//! [`next_action`] is a pure transition from the observed task state and the
//! elapsed wait to what the poller does next. Time only enters through the
//! [`Clock`] trait, so tests drive the loop with a virtual clock.

use super::{TaskSnapshot, TaskStatus, VideoIndexService};
use crate::config::PollingConfig;
use crate::error::{Result, SegmenterError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Source of time for the poll loop
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        // follows tokio's clock, so a paused runtime moves the deadline too
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Lifecycle of an indexing task as seen by the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexingState {
    Pending,
    Indexing,
    Ready { asset_id: String },
    Failed { reason: String },
}

impl IndexingState {
    pub fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        match snapshot.status {
            TaskStatus::Pending => IndexingState::Pending,
            TaskStatus::Indexing => IndexingState::Indexing,
            TaskStatus::Failed => IndexingState::Failed {
                reason: "service reported task failure".to_string(),
            },
            TaskStatus::Ready => match snapshot.asset_id.as_deref() {
                Some(asset_id) if !asset_id.is_empty() => IndexingState::Ready {
                    asset_id: asset_id.to_string(),
                },
                _ => IndexingState::Failed {
                    reason: "task ready without asset id".to_string(),
                },
            },
        }
    }
}

/// What the poll loop does after observing a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    /// Sleep, then query again
    Wait(Duration),
    Complete { asset_id: String },
    Fail { reason: String },
    TimedOut,
}

/// Pure transition function of the poll loop
pub fn next_action(state: &IndexingState, elapsed: Duration, config: &PollingConfig) -> PollAction {
    match state {
        IndexingState::Ready { asset_id } => PollAction::Complete {
            asset_id: asset_id.clone(),
        },
        IndexingState::Failed { reason } => PollAction::Fail {
            reason: reason.clone(),
        },
        IndexingState::Pending | IndexingState::Indexing => {
            let remaining = config.max_wait().saturating_sub(elapsed);
            if remaining.is_zero() {
                PollAction::TimedOut
            } else {
                PollAction::Wait(config.interval().min(remaining))
            }
        }
    }
}

/// Observes indexing tasks until they reach a terminal state
#[derive(Clone)]
pub struct IndexingPoller {
    service: Arc<dyn VideoIndexService>,
    clock: Arc<dyn Clock>,
    config: PollingConfig,
}

impl IndexingPoller {
    pub fn new(service: Arc<dyn VideoIndexService>, clock: Arc<dyn Clock>, config: PollingConfig) -> Self {
        Self {
            service,
            clock,
            config,
        }
    }

    /// Single, non-blocking status lookup
    pub async fn task_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.service
            .get_task(task_id)
            .await
            .map_err(|source| SegmenterError::PollFailed {
                task_id: task_id.to_string(),
                attempts: 1,
                source,
            })
    }

    /// Block (without spinning) until the task is ready and return its asset id
    pub async fn poll_until_ready(&self, task_id: &str) -> Result<String> {
        let started = self.clock.now();
        info!("⏳ Waiting for indexing task {}", task_id);

        loop {
            let snapshot = self.query_with_retry(task_id, started).await?;
            let state = IndexingState::from_snapshot(&snapshot);
            let elapsed = self.clock.now().saturating_duration_since(started);

            match next_action(&state, elapsed, &self.config) {
                PollAction::Complete { asset_id } => {
                    info!("✅ Task {} ready after {:.1}s (asset {})", task_id, elapsed.as_secs_f64(), asset_id);
                    return Ok(asset_id);
                }
                PollAction::Fail { reason } => {
                    warn!("❌ Task {} failed: {}", task_id, reason);
                    return Err(SegmenterError::IndexingFailed {
                        task_id: task_id.to_string(),
                        reason,
                    });
                }
                PollAction::TimedOut => {
                    warn!("⌛ Task {} still {} after {}s", task_id, snapshot.status, elapsed.as_secs());
                    return Err(SegmenterError::IndexingTimeout {
                        task_id: task_id.to_string(),
                        waited_secs: elapsed.as_secs(),
                    });
                }
                PollAction::Wait(delay) => {
                    debug!("Task {} is {}, next poll in {:?}", task_id, snapshot.status, delay);
                    self.clock.sleep(delay).await;
                }
            }
        }
    }

    /// One status query, retrying transient failures with capped exponential backoff.
    ///
    /// Retry sleeps never run past the poll deadline.
    async fn query_with_retry(&self, task_id: &str, started: Instant) -> Result<TaskSnapshot> {
        let mut attempt: u32 = 1;

        loop {
            let error = match self.service.get_task(task_id).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => e,
            };

            let elapsed = self.clock.now().saturating_duration_since(started);
            let remaining = self.config.max_wait().saturating_sub(elapsed);

            if !error.is_transient() || attempt > self.config.max_transient_retries || remaining.is_zero() {
                return Err(SegmenterError::PollFailed {
                    task_id: task_id.to_string(),
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.config.retry_delay(attempt).min(remaining);
            warn!(
                "⚠️ Transient error polling task {} (attempt {}): {}, retrying in {:?}",
                task_id, attempt, error, delay
            );
            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }
}
