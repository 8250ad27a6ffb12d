//! Per-session state: context, recipients, history, assistant binding.

use contextbot_backend::AssistantBinding;
use contextbot_core::types::{new_session_id, Turn};
use contextbot_store::{ContextStore, RecipientRegistry, RegisterOutcome};

/// One chat session. Sessions are independent: each carries its own
/// reference context, recipient registry, in-memory history, and (for the
/// assistant protocol) the remote binding.
#[derive(Debug, Default)]
pub struct Session {
    pub id: String,
    pub context: ContextStore,
    pub recipients: RecipientRegistry,
    pub history: Vec<Turn>,
    /// Remote assistant binding, created lazily on the first query and
    /// rebuilt when the context version moves past it.
    pub binding: Option<AssistantBinding>,
}

impl Session {
    /// Create a session with a fresh opaque id.
    pub fn new() -> Self {
        Self::with_id(new_session_id())
    }

    /// Create a session under an existing id (resuming a persisted log).
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: ContextStore::new(),
            recipients: RecipientRegistry::new(),
            history: Vec::new(),
            binding: None,
        }
    }

    /// Register a notification recipient for this session.
    pub fn register_recipient(&mut self, address: &str) -> RegisterOutcome {
        let outcome = self.recipients.add(address);
        tracing::info!(session_id = %self.id, %address, ?outcome, "Recipient registration");
        outcome
    }
}
