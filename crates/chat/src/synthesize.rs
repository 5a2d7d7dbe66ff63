//! Response synthesizer.
//!
//! Drives the answer model over the assembled context and streams text
//! fragments to the caller, walking the model fallback chain on retryable
//! failures.
//!
//! The fallback window is call setup through the first fragment: a failure in
//! that window advances to the next model and restarts generation from
//! scratch, so the caller never sees fragments from an abandoned attempt. A
//! failure after the first fragment terminates the stream with
//! `ModelUnavailable` and is not retried - fragments already emitted cannot
//! be retracted.

use futures::{Stream, StreamExt};
use ragline_core::{AppError, AppResult};
use ragline_llm::{ChatMessage, LlmRequest, ModelHandle};
use std::pin::Pin;
use std::sync::Arc;

/// Stream of answer text fragments, in generation order.
///
/// Dropping the stream cancels the in-flight generation call.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// Open a streaming generation against the first model in the chain that
/// produces a fragment.
///
/// Each attempt is bounded by its handle's timeout (covering call setup and
/// time to first fragment). When the chain is exhausted the stage fails with
/// `ModelUnavailable`.
pub async fn synthesize(
    chain: &[Arc<ModelHandle>],
    messages: Vec<ChatMessage>,
) -> AppResult<AnswerStream> {
    if chain.is_empty() {
        return Err(AppError::ModelUnavailable(
            "No answer model configured".to_string(),
        ));
    }

    let mut last_error = String::new();

    for (attempt, handle) in chain.iter().enumerate() {
        if attempt > 0 {
            tracing::warn!(
                "Answer model attempt {} failed ({}); falling back to '{}'",
                attempt,
                last_error,
                handle.name
            );
        }

        let request = LlmRequest::new(messages.clone(), &handle.model)
            .with_temperature(handle.temperature.unwrap_or(0.0))
            .with_streaming();

        match open_committed_stream(handle, &request).await {
            Ok(stream) => {
                tracing::info!("Streaming answer from model '{}'", handle.name);
                return Ok(stream);
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }
    }

    Err(AppError::ModelUnavailable(format!(
        "Model fallback chain exhausted; last error: {}",
        last_error
    )))
}

/// Start a stream and wait for its first fragment.
///
/// Returns the full fragment stream only once the model has committed by
/// producing output (or by finishing cleanly with none). Failures before
/// that point are returned to the caller so the chain can advance.
async fn open_committed_stream(
    handle: &Arc<ModelHandle>,
    request: &LlmRequest,
) -> AppResult<AnswerStream> {
    let mut stream = tokio::time::timeout(handle.timeout, handle.client.stream(request))
        .await
        .map_err(|_| {
            AppError::Model(format!(
                "Model '{}' timed out during call setup",
                handle.name
            ))
        })??;

    let first = tokio::time::timeout(handle.timeout, stream.next())
        .await
        .map_err(|_| {
            AppError::Model(format!(
                "Model '{}' produced no fragment within {:?}",
                handle.name, handle.timeout
            ))
        })?;

    let first = match first {
        // Clean end with no output: an empty but successful generation
        None => return Ok(Box::pin(futures::stream::empty())),
        Some(Err(e)) => return Err(e),
        Some(Ok(chunk)) => chunk,
    };

    let name = handle.name.clone();
    let combined = futures::stream::iter(vec![Ok(first)])
        .chain(stream)
        .scan(false, move |finished, item| {
            if *finished {
                return futures::future::ready(None);
            }

            let out = match item {
                Ok(chunk) => {
                    if chunk.done {
                        *finished = true;
                    }
                    if chunk.content.is_empty() {
                        None
                    } else {
                        Some(Ok(chunk.content))
                    }
                }
                // Committed stream: no retry once fragments have been emitted
                Err(e) => {
                    *finished = true;
                    Some(Err(AppError::ModelUnavailable(format!(
                        "Model '{}' failed mid-stream: {}",
                        name, e
                    ))))
                }
            };

            futures::future::ready(Some(out))
        })
        .filter_map(futures::future::ready);

    Ok(Box::pin(combined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlm;

    fn handle(llm: MockLlm) -> Arc<ModelHandle> {
        let name = llm.name().to_string();
        Arc::new(ModelHandle::new(name.clone(), name, Arc::new(llm)))
    }

    async fn collect(stream: AnswerStream) -> AppResult<String> {
        let fragments: Vec<AppResult<String>> = stream.collect().await;
        let mut answer = String::new();
        for fragment in fragments {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }

    #[tokio::test]
    async fn test_primary_streams_answer() {
        let chain = vec![handle(MockLlm::new("primary").streaming(&["Hel", "lo"]))];
        let stream = synthesize(&chain, vec![ChatMessage::human("q")]).await.unwrap();
        assert_eq!(collect(stream).await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_setup_failure_falls_back() {
        let fallback = MockLlm::new("fallback").streaming(&["answer"]);
        let chain = vec![
            handle(MockLlm::new("primary").failing_stream_setup("connection refused")),
            handle(fallback),
        ];

        let stream = synthesize(&chain, vec![ChatMessage::human("q")]).await.unwrap();
        assert_eq!(collect(stream).await.unwrap(), "answer");
    }

    #[tokio::test]
    async fn test_failure_before_first_fragment_falls_back_cleanly() {
        // Primary's stream opens but errors before emitting anything; the
        // caller must see fallback fragments only.
        let chain = vec![
            handle(MockLlm::new("primary").failing_before_first_fragment("reset")),
            handle(MockLlm::new("fallback").streaming(&["clean ", "answer"])),
        ];

        let stream = synthesize(&chain, vec![ChatMessage::human("q")]).await.unwrap();
        assert_eq!(collect(stream).await.unwrap(), "clean answer");
    }

    #[tokio::test]
    async fn test_chain_exhausted_is_model_unavailable() {
        let chain = vec![
            handle(MockLlm::new("primary").failing_stream_setup("down")),
            handle(MockLlm::new("fallback").failing_stream_setup("also down")),
        ];

        let err = synthesize(&chain, vec![ChatMessage::human("q")]).await.map(|_| ()).unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_after_commit_is_terminal() {
        // Fragments were already emitted, so the fallback model must NOT be
        // consulted; the stream ends with ModelUnavailable.
        let fallback = MockLlm::new("fallback").streaming(&["unused"]);
        let fallback_calls = fallback.stream_call_counter();
        let chain = vec![
            handle(MockLlm::new("primary").failing_after_fragments(&["par", "tial"], "reset")),
            handle(fallback),
        ];

        let stream = synthesize(&chain, vec![ChatMessage::human("q")]).await.unwrap();
        let fragments: Vec<AppResult<String>> = stream.collect().await;

        let texts: Vec<&str> = fragments
            .iter()
            .filter_map(|f| f.as_ref().ok().map(String::as_str))
            .collect();
        assert_eq!(texts, ["par", "tial"]);
        assert!(matches!(
            fragments.last().unwrap(),
            Err(AppError::ModelUnavailable(_))
        ));
        assert_eq!(fallback_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_generation_is_not_a_failure() {
        let chain = vec![handle(MockLlm::new("primary").streaming(&[]))];
        let stream = synthesize(&chain, vec![ChatMessage::human("q")]).await.unwrap();
        assert_eq!(collect(stream).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_empty_chain_rejected() {
        let err = synthesize(&[], vec![ChatMessage::human("q")]).await.map(|_| ()).unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
    }
}
