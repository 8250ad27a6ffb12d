//! ContextBot backend crate - model backend clients and the run coordinator.
//!
//! Three protocols are supported: the managed-assistant protocol (uploaded
//! context file, per-query threads, polled runs with tool dispatch), the
//! chat-completion protocol, and the text-generation protocol. The last two
//! are plain request/response clients behind the [`ModelBackend`] trait;
//! the first is driven by [`assistant::RunCoordinator`].

pub mod assistant;
pub mod chat;
pub mod error;
pub mod textgen;
pub mod types;

pub use assistant::{
    AssistantApi, AssistantSpec, CoordinatorOptions, HttpAssistantApi, RunCoordinator,
    ScriptedAssistantApi,
};
pub use chat::ChatCompletionClient;
pub use error::BackendError;
pub use textgen::TextGenerationClient;
pub use types::{
    AssistantBinding, ModelBackend, PendingToolCall, Prompt, RunOutcome, RunState, RunStatus,
    ToolOutput,
};
