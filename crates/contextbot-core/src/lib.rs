//! ContextBot core crate - shared error type, configuration, and value types.
//!
//! Every other ContextBot crate depends on this one. Subsystem crates define
//! their own error enums and convert into [`ContextBotError`] at the
//! boundary so `?` works across crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::ContextBotConfig;
pub use error::{ContextBotError, Result};
pub use types::*;
