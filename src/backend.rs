use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {0}")]
    Status(StatusCode),
    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StartChatResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub session_id: String,
    pub user_message: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub chatbot_response: String,
}

/// The three calls the booking backend exposes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn health(&self) -> Result<HealthResponse, BackendError>;
    async fn start_chat(&self) -> Result<StartChatResponse, BackendError>;
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, BackendError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        // Url::join would drop the last path segment of a base like http://host/api
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path))?)
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
        if !resp.status().is_success() {
            return Err(BackendError::Status(resp.status()));
        }
        resp.json::<T>().await.map_err(BackendError::Decode)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn health(&self) -> Result<HealthResponse, BackendError> {
        let url = self.endpoint("health")?;
        tracing::debug!(%url, "probing backend health");
        let resp = self.client.get(url).send().await?;
        // health is decided by the body's `status` field alone, whatever the status code
        resp.json::<HealthResponse>().await.map_err(BackendError::Decode)
    }

    async fn start_chat(&self) -> Result<StartChatResponse, BackendError> {
        let url = self.endpoint("start_chat")?;
        tracing::debug!(%url, "starting chat session");
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, BackendError> {
        let url = self.endpoint("chat")?;
        tracing::debug!(%url, session_id = %req.session_id, "sending chat message");
        let resp = self.client.post(url).json(&req).send().await?;
        Self::decode(resp).await
    }
}
