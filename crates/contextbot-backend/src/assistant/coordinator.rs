//! Run coordinator: drives a remote assistant run to a terminal state.
//!
//! Owns the lifecycle `queued -> in_progress -> requires_action <->
//! (tool dispatch) -> {completed | failed | ...}`. The wait is bounded by a
//! poll budget and honors a caller-supplied cancellation token at every
//! iteration, so a stuck remote run can never wedge a session.

use std::sync::Arc;
use std::time::Duration;

use contextbot_core::types::EmailDirective;
use contextbot_notify::Notifier;
use tokio_util::sync::CancellationToken;

use crate::assistant::api::{AssistantApi, AssistantSpec};
use crate::error::BackendError;
use crate::types::{AssistantBinding, PendingToolCall, RunOutcome, RunStatus, ToolOutput};

/// Name given to remote assistant configurations.
const ASSISTANT_NAME: &str = "ContextBot";

/// Filename used for the uploaded context document.
const CONTEXT_FILENAME: &str = "context.txt";

/// Tuning knobs for the polling loop and assistant creation.
#[derive(Clone, Debug)]
pub struct CoordinatorOptions {
    /// Model id used when creating the assistant configuration.
    pub model: String,
    /// Sleep between status polls.
    pub poll_interval: Duration,
    /// Poll budget before the run is declared timed out.
    pub max_polls: u32,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            poll_interval: Duration::from_millis(1000),
            max_polls: 60,
        }
    }
}

/// Coordinates assistant bindings, runs, and tool dispatch.
pub struct RunCoordinator {
    api: Arc<dyn AssistantApi>,
    notifier: Arc<dyn Notifier>,
    options: CoordinatorOptions,
}

impl RunCoordinator {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        notifier: Arc<dyn Notifier>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            api,
            notifier,
            options,
        }
    }

    /// Return a binding matching the current context version, reusing the
    /// existing one when it is still current and rebuilding it when the
    /// context has been edited since it was created.
    pub async fn ensure_binding(
        &self,
        context_text: &str,
        context_version: u64,
        instructions: &str,
        existing: Option<&AssistantBinding>,
    ) -> Result<AssistantBinding, BackendError> {
        if let Some(binding) = existing {
            if binding.context_version == context_version {
                return Ok(binding.clone());
            }
            tracing::info!(
                stale_version = binding.context_version,
                current_version = context_version,
                "Context edited since binding was created; rebuilding"
            );
        }

        let file_id = self
            .api
            .upload_context_file(CONTEXT_FILENAME, context_text.as_bytes().to_vec())
            .await?;
        let spec = AssistantSpec {
            name: ASSISTANT_NAME.to_string(),
            instructions: instructions.to_string(),
            model: self.options.model.clone(),
            file_id: file_id.clone(),
            tools: send_email_tool_declaration(),
        };
        let assistant_id = self.api.create_assistant(&spec).await?;
        tracing::info!(%assistant_id, %file_id, context_version, "Assistant binding created");

        Ok(AssistantBinding {
            assistant_id,
            file_id,
            context_version,
        })
    }

    /// Submit a query on a fresh thread and wait for the run to finish.
    ///
    /// API/transport failures bubble up as `Err`; everything the run itself
    /// does (including failing) comes back as a tagged [`RunOutcome`].
    pub async fn ask(
        &self,
        binding: &AssistantBinding,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, BackendError> {
        let thread_id = self.api.create_thread().await?;
        self.api.add_user_message(&thread_id, query).await?;
        let run_id = self
            .api
            .create_run(&thread_id, &binding.assistant_id)
            .await?;
        tracing::debug!(%thread_id, %run_id, "Run started");

        for poll in 0..self.options.max_polls {
            if cancel.is_cancelled() {
                tracing::info!(%run_id, poll, "Run wait cancelled by caller");
                return Ok(RunOutcome::Cancelled);
            }

            let state = self.api.run_state(&thread_id, &run_id).await?;
            match state.status {
                RunStatus::Completed => {
                    let text = self.api.latest_message(&thread_id).await?;
                    tracing::debug!(%run_id, polls = poll, "Run completed");
                    return Ok(RunOutcome::Completed(text));
                }
                RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired => {
                    tracing::warn!(%run_id, status = %state.status, "Run ended without an answer");
                    return Ok(RunOutcome::Failed(format!(
                        "run ended with status {}",
                        state.status
                    )));
                }
                RunStatus::RequiresAction => {
                    let outputs = self.dispatch_tool_calls(&state.tool_calls).await;
                    self.api
                        .submit_tool_outputs(&thread_id, &run_id, outputs)
                        .await?;
                }
                RunStatus::Queued | RunStatus::InProgress => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(%run_id, poll, "Run wait cancelled by caller");
                    return Ok(RunOutcome::Cancelled);
                }
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }

        tracing::warn!(%run_id, max_polls = self.options.max_polls, "Run wait exhausted poll budget");
        Ok(RunOutcome::TimedOut)
    }

    /// Execute every pending tool call and collect the outputs to submit.
    ///
    /// Only `send_email` is implemented; anything else gets an error output
    /// so the remote run can still make progress.
    async fn dispatch_tool_calls(&self, calls: &[PendingToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            let output = match call.name.as_str() {
                "send_email" => match serde_json::from_str::<EmailDirective>(&call.arguments) {
                    Ok(args) => match self
                        .notifier
                        .notify(&args.to, &args.subject, &args.body)
                        .await
                    {
                        Ok(confirmation) => confirmation,
                        Err(e) => {
                            tracing::warn!(error = %e, "Tool-call notification failed");
                            format!("Error: {}", e)
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, call_id = %call.id, "Malformed tool-call arguments");
                        "Error: Invalid function call format.".to_string()
                    }
                },
                other => {
                    tracing::warn!(tool = %other, "Run requested an unimplemented tool");
                    format!("Error: Unknown tool {}", other)
                }
            };
            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            });
        }
        outputs
    }
}

/// Wire-format declaration of the one tool this system implements.
fn send_email_tool_declaration() -> serde_json::Value {
    serde_json::json!([{
        "type": "function",
        "function": {
            "name": "send_email",
            "description": "Send an email notification to a registered recipient",
            "parameters": {
                "type": "object",
                "properties": {
                    "to": {"type": "string", "description": "Recipient email address"},
                    "subject": {"type": "string", "description": "Email subject"},
                    "body": {"type": "string", "description": "Email body"}
                },
                "required": ["to", "subject", "body"]
            }
        }
    }])
}
