//! Question condenser.
//!
//! Rewrites a follow-up question into a standalone query using prior turns.
//! Invoked only when the request carries history; runs against the designated
//! rewrite model, which is a cheaper alternative than the answer model since
//! this is a short rewriting task.

use ragline_core::{AppError, AppResult};
use ragline_llm::{ChatMessage, LlmRequest, ModelHandle};
use ragline_prompt::PromptEngine;

/// Condense a follow-up question into a standalone one.
///
/// One non-streaming model call. The rewrite must preserve the question's
/// language and intent without adding facts - the template carries that
/// instruction, and temperature defaults to zero.
///
/// # Errors
/// Any model failure is `ModelUnavailable` and aborts the request. There is
/// no fallback and no silent use of the raw question: with history present,
/// retrieval quality depends on successful condensation.
pub async fn condense_question(
    handle: &ModelHandle,
    engine: &PromptEngine,
    history: &[ChatMessage],
    question: &str,
) -> AppResult<String> {
    tracing::debug!(
        "Condensing follow-up question with rewrite model '{}'",
        handle.name
    );

    let prompt = engine.render_rephrase(history, question)?;

    let request = LlmRequest::new(vec![ChatMessage::human(prompt)], &handle.model)
        .with_temperature(handle.temperature.unwrap_or(0.0));

    let response = tokio::time::timeout(handle.timeout, handle.client.complete(&request))
        .await
        .map_err(|_| {
            AppError::ModelUnavailable(format!(
                "Rewrite model '{}' timed out after {:?}",
                handle.name, handle.timeout
            ))
        })?
        .map_err(|e| {
            AppError::ModelUnavailable(format!("Rewrite model '{}' failed: {}", handle.name, e))
        })?;

    let standalone = response.content.trim().to_string();
    if standalone.is_empty() {
        return Err(AppError::ModelUnavailable(format!(
            "Rewrite model '{}' returned an empty standalone question",
            handle.name
        )));
    }

    tracing::debug!("Condensed question: {}", standalone);

    Ok(standalone)
}
