//! Shared backend types: prompts, run state, bindings, outcomes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BackendError;

// =============================================================================
// Prompt + ModelBackend
// =============================================================================

/// A fully constructed prompt, protocol-agnostic.
///
/// The chat-completion client sends `system` and `user` as two messages;
/// the text-generation client concatenates them into one string and passes
/// `stop` as stop sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub stop: Vec<String>,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            stop: Vec::new(),
        }
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }
}

/// A single-request model backend (chat-completion or text-generation).
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send one prompt and return the raw generated text.
    async fn answer(&self, prompt: &Prompt) -> Result<String, BackendError>;
}

// =============================================================================
// Assistant protocol types
// =============================================================================

/// Remote run lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunStatus {
    /// True while the run has not reached a terminal state.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::RequiresAction
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(RunStatus::Queued),
            "in_progress" => Ok(RunStatus::InProgress),
            "requires_action" => Ok(RunStatus::RequiresAction),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" | "cancelling" => Ok(RunStatus::Cancelled),
            "expired" => Ok(RunStatus::Expired),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// One tool call the remote run is waiting on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument payload, exactly as the API delivered it.
    pub arguments: String,
}

/// A snapshot of a remote run: its status plus any pending tool calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunState {
    pub status: RunStatus,
    pub tool_calls: Vec<PendingToolCall>,
}

impl RunState {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(status: RunStatus, tool_calls: Vec<PendingToolCall>) -> Self {
        Self { status, tool_calls }
    }
}

/// Output produced for one dispatched tool call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// A remote assistant configuration bound to an uploaded context file.
///
/// `context_version` records the context edit counter the binding was built
/// from; a mismatch means the binding is stale and must be rebuilt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantBinding {
    pub assistant_id: String,
    pub file_id: String,
    pub context_version: u64,
}

/// Tagged result of a coordinated run wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run completed; payload is the assistant's final answer text.
    Completed(String),
    /// The run reached a terminal failure state.
    Failed(String),
    /// The poll budget was exhausted before the run left its pending states.
    TimedOut,
    /// The caller's cancellation token fired.
    Cancelled,
}
