//! Context-restricted prompt construction.
//!
//! Pure functions that turn the effective context text, the registered
//! recipients, and a user query into a prompt for each backend protocol.

use contextbot_backend::Prompt;

/// Sentence the assistant must emit when a question falls outside the
/// supplied context. External contract, reproduced character-for-character.
pub const FALLBACK_SENTENCE: &str =
    "I'm sorry, I can only answer questions based on the provided training content.";

/// Instructions for the managed-assistant protocol, where the context
/// travels as an attached file rather than inline text.
pub fn assistant_instructions() -> String {
    format!(
        "You are a helpful assistant. Answer questions using only the \
         information in the attached training content file. If the answer is \
         not in that content, respond exactly: \"{}\" When the user asks you \
         to send an email notification, call the send_email function with \
         the recipient address, subject, and body.",
        FALLBACK_SENTENCE
    )
}

/// Prompt for the chat-completion protocol. The context is inlined into the
/// system message.
pub fn chat_prompt(context: &str, query: &str) -> Prompt {
    let system = format!(
        "You are a helpful assistant. Answer questions using only the \
         training content below. If the answer is not in the training \
         content, respond exactly: \"{}\"\n\nTraining content:\n{}",
        FALLBACK_SENTENCE, context
    );
    Prompt::new(system, query)
}

/// Prompt for the text-generation protocol. On top of the context lock it
/// lists registered recipients and instructs the model to emit the JSON
/// directive object when asked to notify someone.
pub fn textgen_prompt(context: &str, recipients: &[String], query: &str) -> Prompt {
    let mut system = format!(
        "You are a helpful assistant. Answer questions using only the \
         training content below. If the answer is not in the training \
         content, respond exactly: \"{}\"\n\nTraining content:\n{}",
        FALLBACK_SENTENCE, context
    );
    if !recipients.is_empty() {
        system.push_str(&format!(
            "\n\nRegistered email recipients: {}\nWhen the user asks you to \
             send an email notification, respond with only a JSON object of \
             the form {{\"function\": \"send_email\", \"to\": \"<recipient>\", \
             \"subject\": \"<subject>\", \"body\": \"<body>\"}}.",
            recipients.join(", ")
        ));
    }
    Prompt::new(system, format!("User: {}\nAssistant:", query))
        .with_stop(vec!["\nUser:".to_string()])
}
