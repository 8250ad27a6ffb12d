//! Notification recipient registry.
//!
//! An insertion-ordered set of validated email addresses scoped to one
//! session. Duplicates are rejected, never silently dropped, so the caller
//! can surface an "already registered" message.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("Invalid email regex")
});

/// Result of a registration attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// The address was added to the registry.
    Added,
    /// The address was already present; the registry is unchanged.
    AlreadyRegistered,
    /// The string is not email-shaped; the registry is unchanged.
    Invalid,
}

/// Ordered, duplicate-free set of notification addresses.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecipientRegistry {
    entries: Vec<String>,
}

impl RecipientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address, validating its shape first.
    pub fn add(&mut self, address: &str) -> RegisterOutcome {
        if !EMAIL_RE.is_match(address) {
            return RegisterOutcome::Invalid;
        }
        if self.contains(address) {
            return RegisterOutcome::AlreadyRegistered;
        }
        self.entries.push(address.to_string());
        RegisterOutcome::Added
    }

    /// Remove an address. Returns true if it was present.
    pub fn remove(&mut self, address: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != address);
        self.entries.len() != before
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.iter().any(|e| e == address)
    }

    /// Registered addresses in insertion order.
    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
