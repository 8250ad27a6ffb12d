//! Error types for model backend calls.

use contextbot_core::error::ContextBotError;

/// Errors from backend API calls.
///
/// Every variant is caught by the chat engine and rendered as an
/// `Error: <detail>` bot turn; nothing here is fatal to a session.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Backend returned an empty response")]
    EmptyResponse,
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Protocol(err.to_string())
    }
}

impl From<BackendError> for ContextBotError {
    fn from(err: BackendError) -> Self {
        ContextBotError::Backend(err.to_string())
    }
}
