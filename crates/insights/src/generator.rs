use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "deepseek-r1:7b";

#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("Model service error: {0}")]
    Remote(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("No transactions to analyze")]
    NoTransactions,
}

/// Something that turns a prompt into text.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, InsightsError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Message content of a finished response.
    pub fn into_text(self) -> Result<String, InsightsError> {
        if let Some(error) = self.error {
            return Err(InsightsError::Remote(error));
        }
        if !self.done {
            return Err(InsightsError::Remote("response not finished".to_string()));
        }
        self.message
            .map(|m| m.content)
            .ok_or_else(|| InsightsError::Remote("response has no message".to_string()))
    }
}

/// Client for a local Ollama server's `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, InsightsError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        tracing::debug!(model = %self.model, url = %self.chat_url(), "requesting insights");
        let resp = self.http.post(self.chat_url()).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(InsightsError::Remote(format!("{status} {txt}")));
        }

        resp.json::<ChatResponse>().await?.into_text()
    }
}
