//! Text-generation protocol client.

use async_trait::async_trait;
use serde::Deserialize;

use contextbot_core::config::BackendConfig;

use crate::error::BackendError;
use crate::types::{ModelBackend, Prompt};

/// Single request/response client for `/completions` style endpoints.
///
/// Unlike the chat protocol there is no message structure: the system and
/// user parts are joined into one prompt string and the caller supplies
/// stop sequences to keep the model from continuing the dialogue itself.
pub struct TextGenerationClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

impl TextGenerationClient {
    pub fn new(config: &BackendConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }

    fn render_prompt(prompt: &Prompt) -> String {
        if prompt.system.is_empty() {
            prompt.user.clone()
        } else {
            format!("{}\n\n{}", prompt.system, prompt.user)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerationEnvelope {
    choices: Vec<GenerationChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerationChoice {
    text: String,
}

#[async_trait]
impl ModelBackend for TextGenerationClient {
    async fn answer(&self, prompt: &Prompt) -> Result<String, BackendError> {
        if self.base_url.is_empty() {
            return Err(BackendError::Protocol(
                "text-generation backend requires an explicit base_url".to_string(),
            ));
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": Self::render_prompt(prompt),
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
        });
        if !prompt.stop.is_empty() {
            body["stop"] = serde_json::json!(prompt.stop);
        }

        let resp = self
            .client
            .post(format!("{}/completions", self.base_url))
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

        let envelope: GenerationEnvelope = resp.json().await?;
        let text = envelope
            .choices
            .into_iter()
            .next()
            .map(|c| c.text.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(BackendError::EmptyResponse)?;
        tracing::debug!(chars = text.len(), "Text generation received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_rendering_joins_parts() {
        let prompt = Prompt::new("system part", "user part");
        assert_eq!(
            TextGenerationClient::render_prompt(&prompt),
            "system part\n\nuser part"
        );
    }

    #[test]
    fn test_prompt_rendering_without_system() {
        let prompt = Prompt::new("", "just the question");
        assert_eq!(
            TextGenerationClient::render_prompt(&prompt),
            "just the question"
        );
    }

    #[test]
    fn test_generation_envelope_parses() {
        let json = r#"{"choices": [{"text": "\ngenerated answer\n"}]}"#;
        let envelope: GenerationEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.choices[0].text.trim(), "generated answer");
    }

    #[tokio::test]
    async fn test_missing_base_url_rejected() {
        let client = TextGenerationClient::new(&BackendConfig::default(), "sk-test");
        let err = client
            .answer(&Prompt::new("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Protocol(_)));
    }
}
