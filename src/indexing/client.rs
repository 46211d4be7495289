use super::{AnalysisQuery, IndexInfo, IndexSpec, TaskSnapshot, TaskStatus, VideoIndexService};
use crate::config::{EngineConfig, ServiceConfig};
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// HTTP client for the Twelve Labs video-understanding API
pub struct TwelveLabsClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelEntry {
    model_name: String,
    #[serde(default)]
    model_options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    #[serde(rename = "_id")]
    id: String,
    index_name: String,
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    total_page: u32,
}

#[derive(Debug, Deserialize)]
struct IndexPage {
    #[serde(default)]
    data: Vec<IndexEntry>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

const INDEX_PAGE_LIMIT: u32 = 50;
// hard stop for a misbehaving page_info
const MAX_INDEX_PAGES: u32 = 200;

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    index_name: &'a str,
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    asset_id: Option<String>,
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    video_id: &'a str,
    #[serde(rename = "type")]
    summary_type: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    video_id: &'a str,
    prompt: &'a str,
    stream: bool,
}

impl From<ModelEntry> for EngineConfig {
    fn from(entry: ModelEntry) -> Self {
        EngineConfig {
            model: entry.model_name,
            options: entry.model_options,
        }
    }
}

impl TwelveLabsClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ServiceError::MissingCredential)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl VideoIndexService for TwelveLabsClient {
    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, ServiceError> {
        debug!("Listing indexes at {}", self.base_url);

        let mut indexes = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response = self
                .client
                .get(self.url("indexes"))
                .header("x-api-key", &self.api_key)
                .query(&[("page", page), ("page_limit", INDEX_PAGE_LIMIT)])
                .send()
                .await?;

            let body: IndexPage = Self::read_json(response).await?;
            let total_pages = body.page_info.as_ref().map_or(1, |info| info.total_page);
            let fetched = body.data.len();

            indexes.extend(body.data.into_iter().map(|entry| IndexInfo {
                index_id: entry.id,
                name: entry.index_name,
                engines: entry.models.into_iter().map(EngineConfig::from).collect(),
            }));

            if fetched == 0 || page >= total_pages || page >= MAX_INDEX_PAGES {
                break;
            }
            page += 1;
        }

        debug!("Found {} indexes across {} page(s)", indexes.len(), page);
        Ok(indexes)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<String, ServiceError> {
        let request = CreateIndexRequest {
            index_name: &spec.name,
            models: spec
                .engines
                .iter()
                .map(|engine| ModelEntry {
                    model_name: engine.model.clone(),
                    model_options: engine.options.clone(),
                })
                .collect(),
        };

        debug!("Creating index '{}'", spec.name);

        let response = self
            .client
            .post(self.url("indexes"))
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let created: CreatedResource = Self::read_json(response).await?;
        Ok(created.id)
    }

    async fn submit_task(&self, index_id: &str, video_url: &str) -> Result<String, ServiceError> {
        let form = Form::new()
            .text("index_id", index_id.to_string())
            .text("video_url", video_url.to_string());

        debug!("Submitting indexing task to index {}", index_id);

        let response = self
            .client
            .post(self.url("tasks"))
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let created: CreatedResource = Self::read_json(response).await?;
        if created.id.trim().is_empty() {
            return Err(ServiceError::InvalidResponse("empty task id".to_string()));
        }
        Ok(created.id)
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskSnapshot, ServiceError> {
        let path = format!("tasks/{}", urlencoding::encode(task_id));

        let response = self
            .client
            .get(self.url(&path))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let task: TaskResponse = Self::read_json(response).await?;
        let status = task
            .status
            .as_deref()
            .map(TaskStatus::from_service)
            .ok_or_else(|| ServiceError::InvalidResponse(format!("task {} has no status", task_id)))?;

        Ok(TaskSnapshot {
            task_id: task_id.to_string(),
            status,
            asset_id: task
                .asset_id
                .filter(|id| !id.is_empty())
                .or(task.video_id)
                .filter(|id| !id.is_empty()),
        })
    }

    async fn analyze(
        &self,
        asset_id: &str,
        query: &AnalysisQuery,
    ) -> Result<serde_json::Value, ServiceError> {
        debug!("Running {} query for asset {}", query.label(), asset_id);

        let request = match query {
            AnalysisQuery::Chapters => self.client.post(self.url("summarize")).json(&SummarizeRequest {
                video_id: asset_id,
                summary_type: "chapter",
            }),
            AnalysisQuery::Prompt(prompt) => self.client.post(self.url("analyze")).json(&AnalyzeRequest {
                video_id: asset_id,
                prompt,
                stream: false,
            }),
        };

        let response = request.header("x-api-key", &self.api_key).send().await?;
        Self::read_json(response).await
    }
}
