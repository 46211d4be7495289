#![allow(dead_code)]

use async_trait::async_trait;
use lecture_segmenter::config::EngineConfig;
use lecture_segmenter::indexing::{AnalysisQuery, IndexInfo, IndexSpec};
use lecture_segmenter::{
    Clock, Config, ConfigBuilder, IndexConfig, SegmentationPipeline, ServiceError, TaskSnapshot,
    TaskStatus, VideoIndexService,
};
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// In-memory indexing service that replays scripted answers
pub struct ScriptedService {
    pub indexes: Mutex<Vec<IndexInfo>>,
    pub list_error: Mutex<Option<ServiceError>>,
    pub created: Mutex<Vec<IndexSpec>>,
    pub submissions: Mutex<Vec<(String, String)>>,
    pub submit_error: Mutex<Option<ServiceError>>,
    task_script: Mutex<VecDeque<Result<TaskSnapshot, ServiceError>>>,
    last_task: Mutex<Option<Result<TaskSnapshot, ServiceError>>>,
    pub task_queries: Mutex<Vec<String>>,
    analysis_script: Mutex<VecDeque<Result<Value, ServiceError>>>,
    pub analyze_calls: Mutex<Vec<(String, AnalysisQuery)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            indexes: Mutex::new(Vec::new()),
            list_error: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            submit_error: Mutex::new(None),
            task_script: Mutex::new(VecDeque::new()),
            last_task: Mutex::new(None),
            task_queries: Mutex::new(Vec::new()),
            analysis_script: Mutex::new(VecDeque::new()),
            analyze_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_index(self, index: IndexInfo) -> Self {
        self.indexes.lock().unwrap().push(index);
        self
    }

    pub fn with_list_error(self, error: ServiceError) -> Self {
        *self.list_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_submit_error(self, error: ServiceError) -> Self {
        *self.submit_error.lock().unwrap() = Some(error);
        self
    }

    /// Answers for successive `get_task` calls; the last one repeats
    pub fn with_task_script(self, script: Vec<Result<TaskSnapshot, ServiceError>>) -> Self {
        *self.task_script.lock().unwrap() = script.into();
        self
    }

    /// Answers for successive `analyze` calls; an exhausted script yields `{}`
    pub fn with_analysis(self, script: Vec<Result<Value, ServiceError>>) -> Self {
        *self.analysis_script.lock().unwrap() = script.into();
        self
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn task_query_count(&self) -> usize {
        self.task_queries.lock().unwrap().len()
    }

    pub fn analyze_count(&self) -> usize {
        self.analyze_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoIndexService for ScriptedService {
    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, ServiceError> {
        if let Some(error) = self.list_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.indexes.lock().unwrap().clone())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<String, ServiceError> {
        let mut created = self.created.lock().unwrap();
        created.push(spec.clone());
        let index_id = format!("created-{}", created.len());
        self.indexes.lock().unwrap().push(IndexInfo {
            index_id: index_id.clone(),
            name: spec.name.clone(),
            engines: spec.engines.clone(),
        });
        Ok(index_id)
    }

    async fn submit_task(&self, index_id: &str, video_url: &str) -> Result<String, ServiceError> {
        if let Some(error) = self.submit_error.lock().unwrap().clone() {
            return Err(error);
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push((index_id.to_string(), video_url.to_string()));
        Ok(format!("task-{}", submissions.len()))
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskSnapshot, ServiceError> {
        self.task_queries.lock().unwrap().push(task_id.to_string());

        let next = self.task_script.lock().unwrap().pop_front();
        let answer = match next {
            Some(answer) => {
                *self.last_task.lock().unwrap() = Some(answer.clone());
                answer
            }
            None => self
                .last_task
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(snapshot(task_id, TaskStatus::Pending, None))),
        };

        answer.map(|mut snap| {
            snap.task_id = task_id.to_string();
            snap
        })
    }

    async fn analyze(&self, asset_id: &str, query: &AnalysisQuery) -> Result<Value, ServiceError> {
        self.analyze_calls
            .lock()
            .unwrap()
            .push((asset_id.to_string(), query.clone()));
        self.analysis_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(serde_json::json!({})))
    }
}

/// Virtual clock: sleeping advances time instantly
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    pub sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.elapsed.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

pub fn snapshot(task_id: &str, status: TaskStatus, asset_id: Option<&str>) -> TaskSnapshot {
    TaskSnapshot {
        task_id: task_id.to_string(),
        status,
        asset_id: asset_id.map(str::to_string),
    }
}

pub fn pending() -> Result<TaskSnapshot, ServiceError> {
    Ok(snapshot("", TaskStatus::Pending, None))
}

pub fn indexing() -> Result<TaskSnapshot, ServiceError> {
    Ok(snapshot("", TaskStatus::Indexing, None))
}

pub fn ready(asset_id: &str) -> Result<TaskSnapshot, ServiceError> {
    Ok(snapshot("", TaskStatus::Ready, Some(asset_id)))
}

pub fn failed() -> Result<TaskSnapshot, ServiceError> {
    Ok(snapshot("", TaskStatus::Failed, None))
}

pub fn lecture_index(index_id: &str, name: &str) -> IndexInfo {
    IndexInfo {
        index_id: index_id.to_string(),
        name: name.to_string(),
        engines: vec![
            EngineConfig::new("marengo2.7", &["visual", "audio"]),
            EngineConfig::new("pegasus1.2", &["visual", "audio"]),
        ],
    }
}

pub fn test_config() -> Config {
    ConfigBuilder::new()
        .with_api_key("tlk_test")
        .with_index_name("lectures")
        .with_poll_interval(5)
        .with_max_wait(20)
        .build()
}

pub fn verified_index() -> Arc<IndexConfig> {
    Arc::new(IndexConfig {
        index_id: "idx-1".to_string(),
        name: "lectures".to_string(),
        required_engines: BTreeSet::new(),
    })
}

pub fn pipeline_with(service: Arc<ScriptedService>, config: &Config) -> (SegmentationPipeline, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let dyn_service: Arc<dyn VideoIndexService> = service;
    let pipeline = SegmentationPipeline::new(dyn_service, verified_index(), config, clock.clone());
    (pipeline, clock)
}

pub fn three_chapters_one_inverted() -> Value {
    serde_json::json!({
        "id": "summary-1",
        "summary_type": "chapter",
        "chapters": [
            {"chapter_number": 2, "start_sec": 95, "end_sec": 240, "chapter_title": "Conservation of energy"},
            {"chapter_number": 3, "start_sec": 10, "end_sec": 5, "chapter_title": "Broken entry"},
            {"chapter_number": 1, "start_sec": 0, "end_sec": 95, "chapter_title": "Work and power"}
        ]
    })
}
