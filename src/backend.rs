use crate::config::Config;
use crate::timefmt;
use chrono::{DateTime, Local};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Failures talking to the chat backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid backend URL {0}")]
    InvalidUrl(String),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// One entry of `GET /chat/conversations`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    #[serde(default)]
    pub last_message: String,
    #[serde(default, deserialize_with = "timefmt::deserialize_optional")]
    pub last_updated: Option<DateTime<Local>>,
    #[serde(default)]
    pub message_count: u32,
}

/// One query/response exchange stored by the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub response: String,
    #[serde(default, deserialize_with = "timefmt::deserialize_optional")]
    pub timestamp: Option<DateTime<Local>>,
}

/// Body of `GET /chat/conversation/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationDetail {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Body of `POST /chat/query`
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub conversation_id: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default, deserialize_with = "timefmt::deserialize_optional")]
    pub timestamp: Option<DateTime<Local>>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub database_connected: bool,
    #[serde(default)]
    pub stats: Option<BackendStats>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendStats {
    #[serde(default)]
    pub total_conversations: u64,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub last_activity: Option<String>,
}

/// HTTP client for the conversation backend
#[derive(Clone)]
pub struct BackendClient {
    base_url: Url,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &Config) -> BackendResult<Self> {
        let base_url = Url::parse(&config.backend_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {e}", config.backend_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.backend_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `GET /chat/conversations`
    pub async fn list_conversations(&self) -> BackendResult<Vec<ConversationSummary>> {
        let url = self.endpoint(&["chat", "conversations"]);
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// `GET /chat/conversation/{id}`
    pub async fn get_conversation(&self, id: &str, limit: u32) -> BackendResult<ConversationDetail> {
        let url = self.endpoint(&["chat", "conversation", id]);
        let response = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// `DELETE /chat/conversation/{id}`
    pub async fn delete_conversation(&self, id: &str) -> BackendResult<()> {
        let url = self.endpoint(&["chat", "conversation", id]);
        Self::check(self.client.delete(url).send().await?).await?;
        Ok(())
    }

    /// `POST /chat/query`
    pub async fn send_query(&self, request: &QueryRequest<'_>) -> BackendResult<QueryResponse> {
        let url = self.endpoint(&["chat", "query"]);
        let response = self.client.post(url).json(request).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// `GET /health`
    pub async fn health(&self) -> BackendResult<HealthReport> {
        let url = self.endpoint(&["health"]);
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn check(response: reqwest::Response) -> BackendResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status { status, body })
    }
}
