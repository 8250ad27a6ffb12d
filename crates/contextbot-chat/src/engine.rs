//! Chat engine: query validation, backend dispatch, directive handling,
//! and conversation persistence.
//!
//! Failure policy: backend and notification failures are rendered as
//! `Error: <detail>` bot turns and logged, never raised. Only input
//! validation and log persistence can fail a `handle_query` call.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use contextbot_backend::{ModelBackend, RunCoordinator, RunOutcome};
use contextbot_core::config::ChatConfig;
use contextbot_core::types::Turn;
use contextbot_notify::Notifier;
use contextbot_store::ConversationLog;

use crate::classifier::{classify, Classification};
use crate::error::ChatError;
use crate::prompt::{assistant_instructions, chat_prompt, textgen_prompt, FALLBACK_SENTENCE};
use crate::session::Session;

/// Which backend protocol a session's queries go through.
pub enum Backend {
    /// Managed-assistant protocol, driven by the run coordinator.
    Assistant(RunCoordinator),
    /// Chat-completion protocol: context inlined into a system message.
    ChatCompletion(Arc<dyn ModelBackend>),
    /// Text-generation protocol: single prompt string, directive-aware.
    TextGeneration(Arc<dyn ModelBackend>),
}

/// Orchestrates one session's queries end to end.
pub struct ChatEngine {
    backend: Backend,
    notifier: Arc<dyn Notifier>,
    log: ConversationLog,
    config: ChatConfig,
}

impl ChatEngine {
    pub fn new(
        backend: Backend,
        notifier: Arc<dyn Notifier>,
        log: ConversationLog,
        config: ChatConfig,
    ) -> Self {
        Self {
            backend,
            notifier,
            log,
            config,
        }
    }

    /// Resume a session's history from the conversation log.
    pub fn load_session(&self, session_id: &str) -> Result<Session, ChatError> {
        let mut session = Session::with_id(session_id);
        session.history = self.log.load(session_id)?;
        Ok(session)
    }

    /// Handle one user query and return the visible answer.
    ///
    /// The user turn and the answering bot turn are appended to the session
    /// history and the log is persisted before returning.
    pub async fn handle_query(
        &self,
        session: &mut Session,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        if query.len() > self.config.max_query_length {
            return Err(ChatError::QueryTooLong {
                max: self.config.max_query_length,
            });
        }

        let raw = self.raw_answer(session, query, cancel).await;
        let visible = self.resolve(session, raw).await;

        session.history.push(Turn::user(query));
        session.history.push(Turn::bot(&visible));
        self.log.save(&session.id, &session.history)?;

        if self.config.broadcast_responses && !visible.starts_with("Error:") {
            self.broadcast(session, query, &visible).await;
        }

        Ok(visible)
    }

    /// Obtain the raw model output, with every failure already rendered as
    /// an `Error: <detail>` string.
    async fn raw_answer(
        &self,
        session: &mut Session,
        query: &str,
        cancel: &CancellationToken,
    ) -> String {
        match &self.backend {
            Backend::Assistant(coordinator) => {
                let binding = match coordinator
                    .ensure_binding(
                        &session.context.effective(),
                        session.context.version(),
                        &assistant_instructions(),
                        session.binding.as_ref(),
                    )
                    .await
                {
                    Ok(binding) => binding,
                    Err(e) => {
                        tracing::warn!(session_id = %session.id, error = %e, "Binding setup failed");
                        return format!("Error: {}", e);
                    }
                };
                session.binding = Some(binding.clone());

                match coordinator.ask(&binding, query, cancel).await {
                    Ok(RunOutcome::Completed(text)) => text,
                    Ok(RunOutcome::Failed(reason)) => {
                        tracing::warn!(session_id = %session.id, %reason, "Run failed");
                        format!("Error: {}", reason)
                    }
                    Ok(RunOutcome::TimedOut) => {
                        tracing::warn!(session_id = %session.id, "Run timed out");
                        "Error: The assistant run timed out.".to_string()
                    }
                    Ok(RunOutcome::Cancelled) => "Error: The request was cancelled.".to_string(),
                    Err(e) => {
                        tracing::warn!(session_id = %session.id, error = %e, "Run API call failed");
                        format!("Error: {}", e)
                    }
                }
            }
            Backend::ChatCompletion(model) => {
                if session.context.is_empty() {
                    return FALLBACK_SENTENCE.to_string();
                }
                let prompt = chat_prompt(&session.context.effective(), query);
                match model.answer(&prompt).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(session_id = %session.id, error = %e, "Backend call failed");
                        format!("Error: {}", e)
                    }
                }
            }
            Backend::TextGeneration(model) => {
                if session.context.is_empty() {
                    return FALLBACK_SENTENCE.to_string();
                }
                let prompt = textgen_prompt(
                    &session.context.effective(),
                    session.recipients.as_slice(),
                    query,
                );
                match model.answer(&prompt).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(session_id = %session.id, error = %e, "Backend call failed");
                        format!("Error: {}", e)
                    }
                }
            }
        }
    }

    /// Classify the raw output and apply recipient validation and
    /// notification, producing the visible answer.
    async fn resolve(&self, session: &Session, raw: String) -> String {
        match classify(&raw) {
            Classification::Answer(text) => text,
            Classification::Directive(directive) => {
                if !session.recipients.contains(&directive.to) {
                    tracing::warn!(
                        session_id = %session.id,
                        to = %directive.to,
                        "Directive targets an unregistered recipient"
                    );
                    return format!("Error: Email {} not registered.", directive.to);
                }
                match self
                    .notifier
                    .notify(&directive.to, &directive.subject, &directive.body)
                    .await
                {
                    Ok(confirmation) => confirmation,
                    Err(e) => {
                        tracing::warn!(session_id = %session.id, error = %e, "Notification failed");
                        format!("Error: {}", e)
                    }
                }
            }
            Classification::Malformed => "Error: Invalid function call format.".to_string(),
        }
    }

    /// Notify every registered recipient with the query/response pair.
    /// Failures are logged and do not affect the answer.
    async fn broadcast(&self, session: &Session, query: &str, answer: &str) {
        let body = format!("Q: {}\nA: {}", query, answer);
        for recipient in session.recipients.as_slice() {
            if let Err(e) = self
                .notifier
                .notify(recipient, "New chat response", &body)
                .await
            {
                tracing::warn!(session_id = %session.id, %recipient, error = %e, "Broadcast failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contextbot_backend::{BackendError, Prompt};
    use contextbot_core::types::TurnRole;
    use contextbot_notify::SimulatedNotifier;

    /// Backend double that always returns the same text.
    struct FixedBackend(String);

    #[async_trait]
    impl ModelBackend for FixedBackend {
        async fn answer(&self, _prompt: &Prompt) -> Result<String, BackendError> {
            Ok(self.0.clone())
        }
    }

    /// Backend double that always fails.
    struct BrokenBackend;

    #[async_trait]
    impl ModelBackend for BrokenBackend {
        async fn answer(&self, _prompt: &Prompt) -> Result<String, BackendError> {
            Err(BackendError::Http("connection refused".to_string()))
        }
    }

    fn engine_with(
        output: &str,
        notifier: Arc<SimulatedNotifier>,
        dir: &std::path::Path,
    ) -> ChatEngine {
        ChatEngine::new(
            Backend::TextGeneration(Arc::new(FixedBackend(output.to_string()))),
            notifier,
            ConversationLog::new(dir),
            ChatConfig::default(),
        )
    }

    fn session_with_context() -> Session {
        let mut session = Session::new();
        session.context.set_manual("The warranty period is 12 months.");
        session
    }

    // ---- Validation ----

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with("answer", Arc::new(SimulatedNotifier::new()), dir.path());
        let mut session = session_with_context();
        let err = engine
            .handle_query(&mut session, "   ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyQuery));
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_overlong_query_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with("answer", Arc::new(SimulatedNotifier::new()), dir.path());
        let mut session = session_with_context();
        let long = "x".repeat(ChatConfig::default().max_query_length + 1);
        let err = engine
            .handle_query(&mut session, &long, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::QueryTooLong { .. }));
    }

    // ---- Plain answers ----

    #[tokio::test]
    async fn test_plain_answer_appended_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(
            "12 months.",
            Arc::new(SimulatedNotifier::new()),
            dir.path(),
        );
        let mut session = session_with_context();

        let answer = engine
            .handle_query(&mut session, "How long is the warranty?", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer, "12 months.");

        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, TurnRole::User);
        assert_eq!(session.history[1].role, TurnRole::Bot);
        assert_eq!(session.history[1].message, "12 months.");

        // Persisted log round-trips.
        let log = ConversationLog::new(dir.path());
        let loaded = log.load(&session.id).unwrap();
        assert_eq!(loaded, session.history);
    }

    #[tokio::test]
    async fn test_empty_context_yields_fallback_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(
            "should never be asked",
            Arc::new(SimulatedNotifier::new()),
            dir.path(),
        );
        let mut session = Session::new();

        let answer = engine
            .handle_query(&mut session, "Anything?", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            answer,
            "I'm sorry, I can only answer questions based on the provided training content."
        );
    }

    // ---- Directive handling ----

    #[tokio::test]
    async fn test_registered_directive_invokes_notifier() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(SimulatedNotifier::new());
        let engine = engine_with(
            r#"{"function": "send_email", "to": "a@b.com", "subject": "S", "body": "B"}"#,
            Arc::clone(&notifier),
            dir.path(),
        );
        let mut session = session_with_context();
        session.register_recipient("a@b.com");

        let answer = engine
            .handle_query(&mut session, "Email a@b.com about it", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer, "Email sent successfully");
        assert_eq!(notifier.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_recipient_rejected_without_notify() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(SimulatedNotifier::new());
        let engine = engine_with(
            r#"{"function": "send_email", "to": "a@b.com", "subject": "S", "body": "B"}"#,
            Arc::clone(&notifier),
            dir.path(),
        );
        let mut session = session_with_context();

        let answer = engine
            .handle_query(&mut session, "Email a@b.com about it", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer, "Error: Email a@b.com not registered.");
        assert_eq!(notifier.sent_count(), 0);
        // The rejection is still recorded as a bot turn.
        assert_eq!(session.history[1].message, "Error: Email a@b.com not registered.");
    }

    #[tokio::test]
    async fn test_malformed_directive_surfaced_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(SimulatedNotifier::new());
        let engine = engine_with(
            r#"{"function": "send_email", "to": "a@b.com", "subject":"#,
            Arc::clone(&notifier),
            dir.path(),
        );
        let mut session = session_with_context();

        let answer = engine
            .handle_query(&mut session, "Email someone", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer, "Error: Invalid function call format.");
        assert_eq!(notifier.sent_count(), 0);
    }

    // ---- Backend failure policy ----

    #[tokio::test]
    async fn test_backend_failure_becomes_error_turn() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ChatEngine::new(
            Backend::ChatCompletion(Arc::new(BrokenBackend)),
            Arc::new(SimulatedNotifier::new()),
            ConversationLog::new(dir.path()),
            ChatConfig::default(),
        );
        let mut session = session_with_context();

        let answer = engine
            .handle_query(&mut session, "Anything?", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer, "Error: HTTP error: connection refused");
        assert_eq!(session.history.len(), 2);
    }

    // ---- Broadcast ----

    #[tokio::test]
    async fn test_broadcast_notifies_all_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(SimulatedNotifier::new());
        let engine = ChatEngine::new(
            Backend::TextGeneration(Arc::new(FixedBackend("the answer".to_string()))),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            ConversationLog::new(dir.path()),
            ChatConfig {
                broadcast_responses: true,
                ..ChatConfig::default()
            },
        );
        let mut session = session_with_context();
        session.register_recipient("a@b.com");
        session.register_recipient("c@d.com");

        engine
            .handle_query(&mut session, "Anything?", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(notifier.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_error_turns_are_not_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(SimulatedNotifier::new());
        let engine = ChatEngine::new(
            Backend::ChatCompletion(Arc::new(BrokenBackend)),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            ConversationLog::new(dir.path()),
            ChatConfig {
                broadcast_responses: true,
                ..ChatConfig::default()
            },
        );
        let mut session = session_with_context();
        session.register_recipient("a@b.com");

        engine
            .handle_query(&mut session, "Anything?", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(notifier.sent_count(), 0);
    }

    // ---- Session resumption ----

    #[tokio::test]
    async fn test_load_session_resumes_history() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with("answer", Arc::new(SimulatedNotifier::new()), dir.path());
        let mut session = session_with_context();
        engine
            .handle_query(&mut session, "first question", &CancellationToken::new())
            .await
            .unwrap();

        let resumed = engine.load_session(&session.id).unwrap();
        assert_eq!(resumed.history, session.history);
    }

    #[tokio::test]
    async fn test_load_unknown_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with("answer", Arc::new(SimulatedNotifier::new()), dir.path());
        let resumed = engine.load_session("never-seen").unwrap();
        assert!(resumed.history.is_empty());
    }
}
