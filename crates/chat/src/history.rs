//! History serializer.
//!
//! Turns the caller-supplied turn list into an ordered message sequence.

use crate::request::ChatRequest;
use ragline_core::{AppError, AppResult};
use ragline_llm::ChatMessage;
use serde_json::Value;

/// Convert chat history into a list of messages, preserving input order.
///
/// For each turn: a present, non-null `human` field yields a Human message,
/// then a present, non-null `ai` field yields an Ai message - human first
/// when both are set. Turns with neither field contribute nothing.
///
/// Malformed turns (non-object entries, or a present field that is neither
/// string nor null) are a caller-contract violation and fail with a
/// validation error; they are never silently skipped.
pub fn serialize_history(request: &ChatRequest) -> AppResult<Vec<ChatMessage>> {
    let turns = match &request.chat_history {
        Some(turns) => turns,
        None => return Ok(Vec::new()),
    };

    let mut messages = Vec::new();

    for (i, turn) in turns.iter().enumerate() {
        let turn = turn.as_object().ok_or_else(|| {
            AppError::Validation(format!("chat_history[{}] is not an object", i))
        })?;

        if let Some(content) = field_as_str(turn.get("human"), i, "human")? {
            messages.push(ChatMessage::human(content));
        }

        if let Some(content) = field_as_str(turn.get("ai"), i, "ai")? {
            messages.push(ChatMessage::ai(content));
        }
    }

    Ok(messages)
}

/// Extract an optional string field; a present non-string, non-null value is
/// a validation error.
fn field_as_str<'a>(
    value: Option<&'a Value>,
    index: usize,
    field: &str,
) -> AppResult<Option<&'a str>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(AppError::Validation(format!(
            "chat_history[{}].{} must be a string, got {}",
            index,
            field,
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
