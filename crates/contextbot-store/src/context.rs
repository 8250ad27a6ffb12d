//! Reference-context store.
//!
//! Holds the text the assistant is locked to: manually entered text plus
//! text extracted from an uploaded document. Mutated only by explicit save
//! calls; every mutation bumps a version so stale remote bindings can be
//! detected and rebuilt.

use serde::{Deserialize, Serialize};

/// The reference text a session's assistant is restricted to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContextStore {
    manual_text: String,
    extracted_text: String,
    version: u64,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the manually entered text.
    pub fn set_manual(&mut self, text: impl Into<String>) {
        self.manual_text = text.into();
        self.version += 1;
    }

    /// Replace the document-extracted text.
    pub fn set_extracted(&mut self, text: impl Into<String>) {
        self.extracted_text = text.into();
        self.version += 1;
    }

    pub fn manual(&self) -> &str {
        &self.manual_text
    }

    pub fn extracted(&self) -> &str {
        &self.extracted_text
    }

    /// The effective context: manual and extracted text concatenated with a
    /// separating blank line when both are present.
    pub fn effective(&self) -> String {
        match (
            self.manual_text.trim().is_empty(),
            self.extracted_text.trim().is_empty(),
        ) {
            (true, true) => String::new(),
            (false, true) => self.manual_text.clone(),
            (true, false) => self.extracted_text.clone(),
            (false, false) => format!("{}\n\n{}", self.manual_text, self.extracted_text),
        }
    }

    /// True when there is no usable context at all.
    pub fn is_empty(&self) -> bool {
        self.manual_text.trim().is_empty() && self.extracted_text.trim().is_empty()
    }

    /// Monotonically increasing edit counter. A remote assistant binding
    /// created at version N is stale once `version() != N`.
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let store = ContextStore::new();
        assert!(store.is_empty());
        assert_eq!(store.effective(), "");
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_manual_only() {
        let mut store = ContextStore::new();
        store.set_manual("Q: hours?\nA: 9-6.");
        assert_eq!(store.effective(), "Q: hours?\nA: 9-6.");
        assert!(!store.is_empty());
    }

    #[test]
    fn test_extracted_only() {
        let mut store = ContextStore::new();
        store.set_extracted("page one text");
        assert_eq!(store.effective(), "page one text");
    }

    #[test]
    fn test_both_joined_with_blank_line() {
        let mut store = ContextStore::new();
        store.set_manual("manual part");
        store.set_extracted("extracted part");
        assert_eq!(store.effective(), "manual part\n\nextracted part");
    }

    #[test]
    fn test_whitespace_only_counts_as_empty() {
        let mut store = ContextStore::new();
        store.set_manual("   \n  ");
        assert!(store.is_empty());
        assert_eq!(store.effective(), "");
    }

    #[test]
    fn test_version_bumps_on_every_save() {
        let mut store = ContextStore::new();
        store.set_manual("a");
        assert_eq!(store.version(), 1);
        store.set_extracted("b");
        assert_eq!(store.version(), 2);
        store.set_manual("c");
        assert_eq!(store.version(), 3);
    }

    #[test]
    fn test_replacing_manual_does_not_append() {
        let mut store = ContextStore::new();
        store.set_manual("first");
        store.set_manual("second");
        assert_eq!(store.effective(), "second");
    }
}
