//! Chat-completion protocol client.

use async_trait::async_trait;
use serde::Deserialize;

use contextbot_core::config::BackendConfig;

use crate::error::BackendError;
use crate::types::{ModelBackend, Prompt};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Single request/response client for `/chat/completions` style endpoints.
///
/// The prompt's system and user parts travel as two messages, which is how
/// the context-lock instructions are kept separate from the query.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

impl ChatCompletionClient {
    pub fn new(config: &BackendConfig, api_key: impl Into<String>) -> Self {
        let base_url = if config.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ModelBackend for ChatCompletionClient {
    async fn answer(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
        });
        if !prompt.stop.is_empty() {
            body["stop"] = serde_json::json!(prompt.stop);
        }

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: CompletionEnvelope = resp.json().await?;
        let text = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(BackendError::EmptyResponse)?;
        tracing::debug!(chars = text.len(), "Chat completion received");
        Ok(text)
    }
}
