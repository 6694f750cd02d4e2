use crate::error::{Result, VarianceError};
use crate::llm::types::*;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Chat-completions client for OpenAI and compatible endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Fails straight away on an empty key so a run is rejected before any
    /// variance work starts.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(VarianceError::MissingCredential(
                "an OpenAI API key is required for explanations".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            VarianceError::MissingCredential(format!("{} is not set", API_KEY_ENV))
        })?;
        Self::new(api_key)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replaces the HTTP client with one that enforces `timeout` at the transport level.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat_completion(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatCompletionRequest::from(request);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(VarianceError::ExplanationFailed(format!(
                "OpenAI API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: ChatCompletionResponse = res.json().await?;

        body.first_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| VarianceError::ExplanationFailed("No choices returned".to_string()))
    }
}

#[async_trait]
impl ExplanationService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.chat_completion(request).await
    }
}
