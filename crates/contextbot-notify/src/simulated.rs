//! Simulated notifier.
//!
//! Logs the delivery and always succeeds. The invocation counter feeds the
//! session statistics and lets tests assert the notifier was (or was not)
//! called.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{Notifier, NotifyError};

/// Confirmation line returned for every simulated delivery.
pub const SENT_CONFIRMATION: &str = "Email sent successfully";

/// Always-succeeding notifier that records how many messages it "sent".
#[derive(Debug, Default)]
pub struct SimulatedNotifier {
    sent: AtomicUsize,
}

impl SimulatedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deliveries performed so far.
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Notifier for SimulatedNotifier {
    async fn notify(&self, to: &str, subject: &str, body: &str) -> Result<String, NotifyError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        tracing::info!(to = %to, subject = %subject, body_len = body.len(), "Simulated email sent");
        Ok(SENT_CONFIRMATION.to_string())
    }
}
