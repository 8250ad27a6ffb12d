//! File-backed conversation log.
//!
//! One JSON file per session id under the configured data directory. The
//! full turn list is rewritten on every save; there is no incremental
//! journal, so callers must guarantee a single writer per session id.

use std::path::{Path, PathBuf};

use contextbot_core::error::{ContextBotError, Result};
use contextbot_core::types::Turn;
use tracing::{debug, warn};

/// Repository for per-session conversation history.
pub struct ConversationLog {
    dir: PathBuf,
}

impl ConversationLog {
    /// Create a log repository rooted at `dir`. The directory is created on
    /// first save, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load the ordered turn list for a session.
    ///
    /// A missing file is equivalent to an empty history. A file that exists
    /// but does not parse is an error.
    pub fn load(&self, session_id: &str) -> Result<Vec<Turn>> {
        let path = self.session_path(session_id)?;
        if !path.exists() {
            debug!(session_id, "No saved history");
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        let turns: Vec<Turn> = serde_json::from_str(&content)?;
        debug!(session_id, turns = turns.len(), "History loaded");
        Ok(turns)
    }

    /// Persist the full turn list for a session, replacing any previous file.
    pub fn save(&self, session_id: &str, turns: &[Turn]) -> Result<()> {
        let path = self.session_path(session_id)?;
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(turns)?;
        std::fs::write(&path, content)?;
        debug!(session_id, turns = turns.len(), "History saved");
        Ok(())
    }

    /// Delete the persisted history for a session, if any.
    pub fn clear(&self, session_id: &str) -> Result<()> {
        let path = self.session_path(session_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to clear history");
                Err(e.into())
            }
        }
    }

    /// Resolve the file path for a session id.
    ///
    /// The id becomes a file name, so anything outside
    /// `[A-Za-z0-9._-]` is rejected to keep the path inside the data
    /// directory.
    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        if session_id.is_empty() || !is_safe_session_id(session_id) {
            return Err(ContextBotError::InvalidSessionId(session_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", session_id)))
    }

    /// The directory this repository writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_safe_session_id(id: &str) -> bool {
    !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
