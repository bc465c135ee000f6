use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::models::Paper;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    papers: Vec<Paper>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    paper_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub services: BTreeMap<String, String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// The paper search and chat backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Paper>, ApiError>;

    /// `Ok(None)` when the backend answered without any content.
    async fn chat(&self, paper_id: &str, message: &str) -> Result<Option<String>, ApiError>;

    async fn health(&self) -> Result<HealthStatus, ApiError>;
}

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn with_config(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpBackend {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Paper>, ApiError> {
        debug!("GET /api/papers q={:?} limit={}", query, limit);
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.url("/api/papers"))
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;

        let body: SearchResponse = check_status(response).await?.json().await?;
        info!("search {:?} returned {} papers", query, body.papers.len());
        Ok(body.papers)
    }

    async fn chat(&self, paper_id: &str, message: &str) -> Result<Option<String>, ApiError> {
        debug!("POST /api/chat paper_id={}", paper_id);
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&ChatRequest { paper_id, message })
            .send()
            .await?;

        let body: ChatResponse = check_status(response).await?.json().await?;
        Ok(body.response.filter(|text| !text.trim().is_empty()))
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        let status: HealthStatus = check_status(response).await?.json().await?;
        Ok(status)
    }
}
