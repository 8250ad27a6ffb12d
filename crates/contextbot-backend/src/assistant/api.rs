//! Assistant API surface.
//!
//! [`AssistantApi`] is the seam between the run coordinator and the remote
//! service: the HTTP implementation talks to the hosted assistants API,
//! while tests drive the coordinator with a scripted in-memory double.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BackendError;
use crate::types::{PendingToolCall, RunState, RunStatus, ToolOutput};

/// Default base URL for the hosted assistants API.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Everything needed to create a remote assistant configuration.
#[derive(Clone, Debug)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    pub model: String,
    /// Uploaded context file the assistant is bound to.
    pub file_id: String,
    /// Tool declarations, in the wire format the API expects.
    pub tools: serde_json::Value,
}

/// Remote assistant service operations used by the coordinator.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Upload the context document; returns the remote file id.
    async fn upload_context_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError>;

    /// Create an assistant configuration; returns the assistant id.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, BackendError>;

    /// Create a fresh conversation thread; returns the thread id.
    async fn create_thread(&self) -> Result<String, BackendError>;

    /// Post a user message onto a thread.
    async fn add_user_message(&self, thread_id: &str, content: &str)
        -> Result<(), BackendError>;

    /// Start a run of the assistant against a thread; returns the run id.
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, BackendError>;

    /// Fetch the current run status plus any pending tool calls.
    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState, BackendError>;

    /// Submit the outputs for every pending tool call of a run.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), BackendError>;

    /// The most recent message on a thread (the assistant's final answer).
    async fn latest_message(&self, thread_id: &str) -> Result<String, BackendError>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// HTTP client for the hosted assistants API.
pub struct HttpAssistantApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAssistantApi {
    /// Create a client. An empty `base_url` selects the provider default.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    /// Surface non-2xx responses as [`BackendError::Api`].
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Debug, Deserialize)]
struct IdEnvelope {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    status: String,
    #[serde(default)]
    required_action: Option<RequiredAction>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Vec<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    text: Option<WireText>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    value: String,
}

#[async_trait]
impl AssistantApi for HttpAssistantApi {
    async fn upload_context_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);
        let resp = self
            .authed(self.client.post(self.url("/files")))
            .multipart(form)
            .send()
            .await?;
        let envelope: IdEnvelope = Self::check(resp).await?.json().await?;
        tracing::debug!(file_id = %envelope.id, "Context file uploaded");
        Ok(envelope.id)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, BackendError> {
        let body = serde_json::json!({
            "name": spec.name,
            "instructions": spec.instructions,
            "model": spec.model,
            "tools": spec.tools,
            "file_ids": [spec.file_id],
        });
        let resp = self
            .authed(self.client.post(self.url("/assistants")))
            .json(&body)
            .send()
            .await?;
        let envelope: IdEnvelope = Self::check(resp).await?.json().await?;
        tracing::debug!(assistant_id = %envelope.id, file_id = %spec.file_id, "Assistant created");
        Ok(envelope.id)
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        let resp = self
            .authed(self.client.post(self.url("/threads")))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let envelope: IdEnvelope = Self::check(resp).await?.json().await?;
        Ok(envelope.id)
    }

    async fn add_user_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({ "role": "user", "content": content });
        let resp = self
            .authed(
                self.client
                    .post(self.url(&format!("/threads/{}/messages", thread_id))),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, BackendError> {
        let body = serde_json::json!({ "assistant_id": assistant_id });
        let resp = self
            .authed(
                self.client
                    .post(self.url(&format!("/threads/{}/runs", thread_id))),
            )
            .json(&body)
            .send()
            .await?;
        let envelope: IdEnvelope = Self::check(resp).await?.json().await?;
        Ok(envelope.id)
    }

    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState, BackendError> {
        let resp = self
            .authed(
                self.client
                    .get(self.url(&format!("/threads/{}/runs/{}", thread_id, run_id))),
            )
            .send()
            .await?;
        let envelope: RunEnvelope = Self::check(resp).await?.json().await?;

        let status: RunStatus = envelope
            .status
            .parse()
            .map_err(BackendError::Protocol)?;
        let tool_calls = envelope
            .required_action
            .map(|ra| {
                ra.submit_tool_outputs
                    .tool_calls
                    .into_iter()
                    .map(|tc| PendingToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        arguments: tc.function.arguments,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(RunState { status, tool_calls })
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({ "tool_outputs": outputs });
        let resp = self
            .authed(self.client.post(self.url(&format!(
                "/threads/{}/runs/{}/submit_tool_outputs",
                thread_id, run_id
            ))))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn latest_message(&self, thread_id: &str) -> Result<String, BackendError> {
        let resp = self
            .authed(
                self.client
                    .get(self.url(&format!("/threads/{}/messages", thread_id))),
            )
            .send()
            .await?;
        let list: MessageList = Self::check(resp).await?.json().await?;

        // Messages are listed newest-first; the first text block of the
        // first message is the assistant's answer.
        list.data
            .first()
            .and_then(|m| m.content.iter().find_map(|c| c.text.as_ref()))
            .map(|t| t.value.clone())
            .ok_or(BackendError::EmptyResponse)
    }
}
