//! Outbound notification delivery.
//!
//! Defines the [`Notifier`] trait plus the simulated always-succeeding
//! implementation this system ships with. A real transport implements the
//! same trait and is expected to surface [`NotifyError`] variants instead
//! of pretending everything was delivered.

pub mod simulated;

use async_trait::async_trait;

pub use simulated::SimulatedNotifier;

/// Stand-in used when notifications are switched off in config. Every
/// delivery attempt reports [`NotifyError::Disabled`]; nothing is sent.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

/// Errors from notification delivery.
///
/// The simulator never produces these; a real transport maps invalid
/// addresses and transient transport failures onto them so the chat engine
/// can decide whether to surface or retry.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Notifications are disabled")]
    Disabled,
}

/// Delivers an outbound notification to a single recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. On success, returns the human-readable
    /// confirmation line shown to the user as the answer.
    async fn notify(&self, to: &str, subject: &str, body: &str) -> Result<String, NotifyError>;
}

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, to: &str, _subject: &str, _body: &str) -> Result<String, NotifyError> {
        tracing::info!(to = %to, "Notification suppressed (notifier disabled)");
        Err(NotifyError::Disabled)
    }
}
