//! Chat request wire type.

use serde::{Deserialize, Serialize};

/// One inbound conversational request.
///
/// `chat_history` entries are carried as raw JSON values: each should be an
/// object with optional `human` and `ai` string fields, but the history
/// serializer - not the transport - enforces that contract, so malformed
/// turns surface as validation errors instead of being silently coerced.
///
/// The caller supplies the full history on every request; nothing is kept
/// server-side between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The current question
    pub question: String,

    /// Prior turns, oldest first; absent or empty means a fresh conversation
    #[serde(default)]
    pub chat_history: Option<Vec<serde_json::Value>>,
}

impl ChatRequest {
    /// Create a request with no history.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            chat_history: None,
        }
    }

    /// Create a request with history turns.
    pub fn with_history(question: impl Into<String>, history: Vec<serde_json::Value>) -> Self {
        Self {
            question: question.into(),
            chat_history: Some(history),
        }
    }
}
