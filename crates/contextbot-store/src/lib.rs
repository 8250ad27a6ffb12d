//! ContextBot store crate - per-session persistence.
//!
//! Provides the file-backed conversation log (one JSON file per session id,
//! fully rewritten on each save), the reference-context store, and the
//! ordered duplicate-rejecting notification recipient registry.

pub mod context;
pub mod memory;
pub mod recipients;

pub use context::ContextStore;
pub use memory::ConversationLog;
pub use recipients::{RecipientRegistry, RegisterOutcome};
