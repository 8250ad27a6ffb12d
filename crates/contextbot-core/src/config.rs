use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ContextBotError, Result};

/// Top-level configuration for the ContextBot service.
///
/// Loaded from `~/.contextbot/config.toml` by default. Each section
/// corresponds to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl ContextBotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ContextBotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ContextBotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for persisted conversation logs.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.contextbot/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Which model-backend protocol a session talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendProvider {
    /// Managed-assistant protocol: uploaded context file, threads, polled runs.
    Assistant,
    /// Chat-completion protocol: context inlined into a system message.
    #[default]
    ChatCompletion,
    /// Text-generation protocol: single prompt string, directive-aware.
    TextGeneration,
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Protocol the backend speaks.
    pub provider: BackendProvider,
    /// Base URL of the backend API. Empty string means the provider default.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
    /// Milliseconds to sleep between run status polls (assistant protocol).
    pub poll_interval_ms: u64,
    /// Maximum number of status polls before the run is declared timed out.
    pub max_polls: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendProvider::ChatCompletion,
            base_url: String::new(),
            api_key_env: "CONTEXTBOT_API_KEY".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            poll_interval_ms: 1000,
            max_polls: 60,
        }
    }
}

/// Chat engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum query length in characters.
    pub max_query_length: usize,
    /// Notify every registered recipient with the query/response pair after
    /// a successful answer.
    pub broadcast_responses: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_query_length: 2000,
            broadcast_responses: false,
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Master switch for the notifier. When disabled, directives surface a
    /// disabled notice and nothing is delivered.
    pub enabled: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ContextBotConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.backend.provider, BackendProvider::ChatCompletion);
        assert_eq!(config.backend.model, "gpt-4o");
        assert_eq!(config.backend.max_polls, 60);
        assert_eq!(config.chat.max_query_length, 2000);
        assert!(config.notify.enabled);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ContextBotConfig::default();
        config.backend.provider = BackendProvider::Assistant;
        config.backend.model = "gpt-4.1".to_string();
        config.backend.poll_interval_ms = 250;
        config.chat.broadcast_responses = true;

        config.save(&path).unwrap();
        let loaded = ContextBotConfig::load(&path).unwrap();

        assert_eq!(loaded.backend.provider, BackendProvider::Assistant);
        assert_eq!(loaded.backend.model, "gpt-4.1");
        assert_eq!(loaded.backend.poll_interval_ms, 250);
        assert!(loaded.chat.broadcast_responses);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(ContextBotConfig::load(&path).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = ContextBotConfig::load_or_default(&path);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend]\nmodel = \"mixtral-8x7b-instruct\"\n").unwrap();

        let config = ContextBotConfig::load(&path).unwrap();
        assert_eq!(config.backend.model, "mixtral-8x7b-instruct");
        // Untouched fields keep their defaults.
        assert_eq!(config.backend.max_tokens, 512);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_malformed_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [[[").unwrap();
        assert!(ContextBotConfig::load(&path).is_err());
    }

    #[test]
    fn test_provider_serde_names() {
        let toml_str = "[backend]\nprovider = \"text_generation\"\n";
        let config: ContextBotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.provider, BackendProvider::TextGeneration);
    }
}
