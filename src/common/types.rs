use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores strictly above this are flagged as spam.
pub const SPAM_THRESHOLD: f64 = 0.5;

/// Outcome of a spam classification. Only its fields are copied into a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub spam_level: f64,
    pub is_spam: bool,
}

impl ClassificationResult {
    pub fn from_score(spam_level: f64) -> Self {
        Self {
            spam_level,
            is_spam: spam_level > SPAM_THRESHOLD,
        }
    }

    /// Fail-open default used whenever the classifier cannot answer.
    pub fn not_spam() -> Self {
        Self::from_score(0.0)
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::not_spam()
    }
}

/// Chat message as stored in a room's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: String,
    pub content: String,
    pub time_stamp: DateTime<Utc>,
    pub spam_level: f64,
    pub is_spam: bool,
}

impl Message {
    /// Builds a message stamped with the current time and the given classification.
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        spam: ClassificationResult,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            time_stamp: Utc::now(),
            spam_level: spam.spam_level,
            is_spam: spam.is_spam,
        }
    }
}

/// A room and its messages in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Room {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            messages: Vec::new(),
        }
    }
}

/// Payload accepted by the submission entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub room_id: String,
    pub sender: String,
    pub content: String,
}
