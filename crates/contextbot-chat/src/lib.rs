//! Conversational interface for ContextBot.
//!
//! Provides directive classification of model output, context-restricted
//! prompt construction, session state, and the chat engine that ties the
//! model backends, the notifier, and the conversation log together.

pub mod classifier;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod session;

pub use classifier::{classify, Classification};
pub use engine::{Backend, ChatEngine};
pub use error::ChatError;
pub use prompt::{
    assistant_instructions, chat_prompt, textgen_prompt, FALLBACK_SENTENCE,
};
pub use session::Session;
