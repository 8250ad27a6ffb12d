use thiserror::Error;

/// Top-level error type for the ContextBot system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for
/// ContextBotError` so that the `?` operator works seamlessly across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContextBotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ContextBotError {
    fn from(err: toml::de::Error) -> Self {
        ContextBotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ContextBotError {
    fn from(err: toml::ser::Error) -> Self {
        ContextBotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ContextBotError {
    fn from(err: serde_json::Error) -> Self {
        ContextBotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ContextBot operations.
pub type Result<T> = std::result::Result<T, ContextBotError>;
