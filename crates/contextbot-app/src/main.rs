//! ContextBot application binary - composition root.
//!
//! Ties together the ContextBot crates into a single executable:
//! 1. Load configuration from TOML (CLI args override file values)
//! 2. Build the notifier and the configured model backend
//! 3. Open the per-session conversation log
//! 4. Run the interactive chat loop
//!
//! Queries in flight can be cancelled with Ctrl-C; the session survives.

mod cli;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;

use contextbot_backend::{
    ChatCompletionClient, CoordinatorOptions, HttpAssistantApi, RunCoordinator,
    TextGenerationClient,
};
use contextbot_chat::{Backend, ChatEngine, ChatError, Session};
use contextbot_core::config::{BackendProvider, ContextBotConfig};
use contextbot_core::types::new_session_id;
use contextbot_notify::{DisabledNotifier, Notifier, SimulatedNotifier};
use contextbot_store::{ConversationLog, RegisterOutcome};

use cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Build the configured model backend.
fn build_backend(config: &ContextBotConfig, notifier: Arc<dyn Notifier>) -> Backend {
    let api_key = std::env::var(&config.backend.api_key_env).unwrap_or_else(|_| {
        tracing::warn!(
            var = %config.backend.api_key_env,
            "API key variable not set; backend calls will fail until it is"
        );
        String::new()
    });

    match config.backend.provider {
        BackendProvider::Assistant => {
            let api = HttpAssistantApi::new(&config.backend.base_url, api_key);
            let options = CoordinatorOptions {
                model: config.backend.model.clone(),
                poll_interval: Duration::from_millis(config.backend.poll_interval_ms),
                max_polls: config.backend.max_polls,
            };
            Backend::Assistant(RunCoordinator::new(Arc::new(api), notifier, options))
        }
        BackendProvider::ChatCompletion => Backend::ChatCompletion(Arc::new(
            ChatCompletionClient::new(&config.backend, api_key),
        )),
        BackendProvider::TextGeneration => Backend::TextGeneration(Arc::new(
            TextGenerationClient::new(&config.backend, api_key),
        )),
    }
}

const HELP: &str = "\
Commands:
  :context <text>    set the reference context
  :pdf <path>        extract text from a PDF and add it to the context
  :register <addr>   register a notification recipient
  :remove <addr>     remove a registered recipient
  :recipients        list registered recipients
  :history           print the conversation so far
  :clear             clear the persisted conversation log
  :help              show this help
  :quit              exit
Anything else is sent to the assistant as a question.";

/// Handle one `:command` line. Returns false when the loop should exit.
fn handle_command(session: &mut Session, log: &ConversationLog, line: &str) -> bool {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match command {
        ":context" => {
            if rest.is_empty() {
                println!("Usage: :context <text>");
            } else {
                session.context.set_manual(rest);
                println!("Context set ({} characters).", rest.len());
            }
        }
        ":pdf" => match std::fs::read(rest) {
            Ok(bytes) => {
                let text = contextbot_extract::extract_pdf_text(&bytes);
                if text.is_empty() {
                    println!("No text could be extracted from {}.", rest);
                } else {
                    println!("Extracted {} characters from {}.", text.len(), rest);
                }
                session.context.set_extracted(text);
            }
            Err(e) => println!("Could not read {}: {}", rest, e),
        },
        ":register" => match session.register_recipient(rest) {
            RegisterOutcome::Added => println!("Registered {}.", rest),
            RegisterOutcome::AlreadyRegistered => println!("{} is already registered.", rest),
            RegisterOutcome::Invalid => println!("Invalid email address: {}", rest),
        },
        ":remove" => {
            if session.recipients.remove(rest) {
                println!("Removed {}.", rest);
            } else {
                println!("{} is not registered.", rest);
            }
        }
        ":recipients" => {
            if session.recipients.is_empty() {
                println!("No recipients registered.");
            } else {
                for addr in session.recipients.as_slice() {
                    println!("  {}", addr);
                }
            }
        }
        ":history" => {
            for turn in &session.history {
                let stamp = turn.timestamp.as_deref().unwrap_or("--:--");
                println!("[{}] {}: {}", stamp, turn.role, turn.message);
            }
        }
        ":clear" => {
            session.history.clear();
            match log.clear(&session.id) {
                Ok(()) => println!("Conversation cleared."),
                Err(e) => println!("Could not clear the log: {}", e),
            }
        }
        ":help" => println!("{}", HELP),
        ":quit" | ":exit" => return false,
        other => println!("Unknown command {}. Try :help.", other),
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ContextBotConfig::load_or_default(&config_file);
    if let Some(data_dir) = args.resolve_data_dir() {
        config.general.data_dir = data_dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.general.log_level.clone())),
        )
        .init();

    tracing::info!("Starting ContextBot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let log = ConversationLog::new(&data_dir);

    // Notifier.
    let notifier: Arc<dyn Notifier> = if config.notify.enabled {
        Arc::new(SimulatedNotifier::new())
    } else {
        tracing::info!("Notifications disabled in config");
        Arc::new(DisabledNotifier)
    };

    // Backend + engine.
    let backend = build_backend(&config, Arc::clone(&notifier));
    let engine = ChatEngine::new(
        backend,
        notifier,
        ConversationLog::new(&data_dir),
        config.chat.clone(),
    );

    // Session (resumed when --session is given).
    let mut session = match args.session {
        Some(id) => {
            let session = engine.load_session(&id)?;
            tracing::info!(session_id = %id, turns = session.history.len(), "Session resumed");
            session
        }
        None => Session::with_id(new_session_id()),
    };

    println!("ContextBot session {}. Type :help for commands.", session.id);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(':') {
            if !handle_command(&mut session, &log, line) {
                break;
            }
            continue;
        }

        // Ctrl-C cancels the query in flight, not the session.
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        match engine.handle_query(&mut session, line, &cancel).await {
            Ok(answer) => println!("{}", answer),
            Err(e @ (ChatError::EmptyQuery | ChatError::QueryTooLong { .. })) => {
                println!("{}", e);
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not persist the conversation");
                println!("Error: {}", e);
            }
        }
        watcher.abort();
    }

    tracing::info!(session_id = %session.id, "Session ended");
    Ok(())
}
