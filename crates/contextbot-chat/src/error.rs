//! Error types for the chat crate.

use contextbot_core::error::ContextBotError;

/// Errors surfaced directly to the caller of the chat engine.
///
/// Backend and notification failures are NOT represented here: they are
/// rendered as `Error: <detail>` bot turns and logged, never raised. Only
/// input validation and log persistence can fail the call itself.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Query is empty")]
    EmptyQuery,
    #[error("Query exceeds the maximum length of {max} characters")]
    QueryTooLong { max: usize },
    #[error(transparent)]
    Core(#[from] ContextBotError),
}

impl From<ChatError> for ContextBotError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Core(e) => e,
            other => ContextBotError::Config(other.to_string()),
        }
    }
}
