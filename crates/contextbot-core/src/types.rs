use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who produced a conversation turn.
///
/// Serialized as `"user"` / `"bot"` to match the persisted record format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Bot,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Bot => write!(f, "bot"),
        }
    }
}

impl std::str::FromStr for TurnRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TurnRole::User),
            "bot" => Ok(TurnRole::Bot),
            _ => Err(format!("Unknown turn role: {}", s)),
        }
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// One turn in a conversation.
///
/// The on-disk record shape is `{"type": "user"|"bot", "message": ...,
/// "timestamp": ...}`; the `timestamp` key is omitted when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "type")]
    pub role: TurnRole,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Turn {
    /// A user turn stamped with the current wall-clock time.
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            message: message.into(),
            timestamp: Some(wall_clock_hhmm()),
        }
    }

    /// A bot turn stamped with the current wall-clock time.
    pub fn bot(message: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Bot,
            message: message.into(),
            timestamp: Some(wall_clock_hhmm()),
        }
    }
}

/// A parsed notification directive: recipient, subject, body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDirective {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Generate a fresh opaque session identifier.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Local wall-clock time as `HH:MM`, the timestamp granularity of the
/// persisted conversation record.
pub fn wall_clock_hhmm() -> String {
    Local::now().format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_turn_role_display_roundtrip() {
        assert_eq!(TurnRole::User.to_string(), "user");
        assert_eq!(TurnRole::Bot.to_string(), "bot");
        assert_eq!(TurnRole::from_str("user").unwrap(), TurnRole::User);
        assert_eq!(TurnRole::from_str("bot").unwrap(), TurnRole::Bot);
        assert!(TurnRole::from_str("assistant").is_err());
    }

    #[test]
    fn test_turn_serializes_with_type_key() {
        let turn = Turn {
            role: TurnRole::User,
            message: "hello".to_string(),
            timestamp: Some("09:30".to_string()),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["message"], "hello");
        assert_eq!(json["timestamp"], "09:30");
    }

    #[test]
    fn test_turn_omits_missing_timestamp() {
        let turn = Turn {
            role: TurnRole::Bot,
            message: "answer".to_string(),
            timestamp: None,
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert!(!json.contains("timestamp"));
    }

    #[test]
    fn test_turn_deserializes_legacy_record() {
        let json = r#"{"type": "bot", "message": "hi there"}"#;
        let turn: Turn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.role, TurnRole::Bot);
        assert_eq!(turn.message, "hi there");
        assert!(turn.timestamp.is_none());
    }

    #[test]
    fn test_turn_constructors_stamp_time() {
        let turn = Turn::user("question");
        assert_eq!(turn.role, TurnRole::User);
        let ts = turn.timestamp.unwrap();
        // HH:MM shape
        assert_eq!(ts.len(), 5);
        assert_eq!(ts.as_bytes()[2], b':');
    }

    #[test]
    fn test_email_directive_roundtrip() {
        let directive = EmailDirective {
            to: "a@b.com".to_string(),
            subject: "S".to_string(),
            body: "B".to_string(),
        };
        let json = serde_json::to_string(&directive).unwrap();
        let back: EmailDirective = serde_json::from_str(&json).unwrap();
        assert_eq!(back, directive);
    }

    #[test]
    fn test_new_session_id_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
