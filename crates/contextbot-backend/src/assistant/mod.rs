//! Managed-assistant protocol: API surface and the run coordinator.

pub mod api;
pub mod coordinator;
pub mod scripted;

pub use api::{AssistantApi, AssistantSpec, HttpAssistantApi};
pub use coordinator::{CoordinatorOptions, RunCoordinator};
pub use scripted::ScriptedAssistantApi;
