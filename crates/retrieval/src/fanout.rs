//! Concurrent retrieval fan-out with deterministic merge.
//!
//! One query goes to every configured back-end at once. Results are merged by
//! concatenating each back-end's list in declared back-end order, never in
//! arrival order, with no cross-source deduplication or re-ranking, so
//! citation tags assigned downstream stay stable.

use crate::providers::HttpRetriever;
use crate::retriever::Retriever;
use crate::types::EvidenceItem;
use futures::future::join_all;
use ragline_core::config::RetrieverConfig;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// A configured retrieval back-end: the capability handle plus its query
/// parameters. The position of a handle in the fan-out slice is its merge
/// position.
#[derive(Clone)]
pub struct RetrieverHandle {
    /// Declared back-end name
    pub name: String,

    /// Number of evidence items to request
    pub top_k: usize,

    /// Minimum similarity score forwarded to the back-end
    pub score_threshold: Option<f32>,

    /// Per-call timeout; bounds this back-end's contribution to fan-out
    /// latency
    pub timeout: Duration,

    /// The back-end capability
    pub retriever: Arc<dyn Retriever>,
}

impl RetrieverHandle {
    /// Create a handle around an arbitrary retriever.
    pub fn new(retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self {
            name: retriever.name().to_string(),
            top_k,
            score_threshold: None,
            timeout: Duration::from_secs(30),
            retriever,
        }
    }

    /// Set the score threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build an HTTP-backed handle from a back-end declaration.
    pub fn from_config(config: &RetrieverConfig) -> AppResult<Self> {
        Ok(Self {
            name: config.name.clone(),
            top_k: config.top_k,
            score_threshold: config.score_threshold,
            timeout: Duration::from_secs(config.timeout_secs),
            retriever: Arc::new(HttpRetriever::from_config(config)?),
        })
    }
}

impl std::fmt::Debug for RetrieverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrieverHandle")
            .field("name", &self.name)
            .field("top_k", &self.top_k)
            .field("score_threshold", &self.score_threshold)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Build the ordered back-end list from application configuration.
pub fn build_retrievers(configs: &[RetrieverConfig]) -> AppResult<Vec<RetrieverHandle>> {
    configs.iter().map(RetrieverHandle::from_config).collect()
}

/// Query every back-end concurrently and merge the results.
///
/// Each call is bounded by its handle's timeout. A back-end that fails or
/// times out contributes an empty list (soft failure, logged at warn). If
/// every back-end fails, the stage fails with `UpstreamUnavailable` instead
/// of answering from zero grounding.
///
/// Dropping the returned future cancels all still-outstanding calls.
pub async fn fan_out(
    query: &str,
    backends: &[RetrieverHandle],
) -> AppResult<Vec<EvidenceItem>> {
    if backends.is_empty() {
        return Err(AppError::UpstreamUnavailable(
            "No retrieval back-ends configured".to_string(),
        ));
    }

    tracing::debug!(
        "Fanning out query to {} back-end(s): {:?}",
        backends.len(),
        query
    );

    let calls = backends.iter().map(|handle| async move {
        let result = tokio::time::timeout(
            handle.timeout,
            handle
                .retriever
                .search(query, handle.top_k, handle.score_threshold),
        )
        .await;

        match result {
            Ok(Ok(items)) => Ok(items),
            Ok(Err(e)) => Err(AppError::Retrieval(format!(
                "Back-end '{}' failed: {}",
                handle.name, e
            ))),
            Err(_) => Err(AppError::Retrieval(format!(
                "Back-end '{}' timed out after {:?}",
                handle.name, handle.timeout
            ))),
        }
    });

    // join_all preserves input order, so the merge below is declared order
    // regardless of which back-end answered first.
    let results = join_all(calls).await;

    let mut merged = Vec::new();
    let mut failures = 0;

    for result in results {
        match result {
            Ok(items) => merged.extend(items),
            Err(e) => {
                failures += 1;
                tracing::warn!("Soft retrieval failure: {}", e);
            }
        }
    }

    if failures == backends.len() {
        return Err(AppError::UpstreamUnavailable(format!(
            "All {} retrieval back-end(s) failed",
            backends.len()
        )));
    }

    tracing::info!(
        "Merged {} evidence item(s) from {} back-end(s) ({} failed)",
        merged.len(),
        backends.len(),
        failures
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Back-end that answers with fixed items after an optional delay.
    struct StubRetriever {
        name: String,
        items: Vec<EvidenceItem>,
        delay: Duration,
        fail: bool,
    }

    impl StubRetriever {
        fn new(name: &str, contents: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                items: contents.iter().map(|c| EvidenceItem::new(*c)).collect(),
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait::async_trait]
    impl Retriever for StubRetriever {
        fn name(&self) -> &str {
            &self.name
        }

        async fn search(
            &self,
            _query: &str,
            _k: usize,
            _score_threshold: Option<f32>,
        ) -> AppResult<Vec<EvidenceItem>> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(AppError::Retrieval("stub failure".to_string()));
            }
            Ok(self.items.clone())
        }
    }

    fn handle(retriever: StubRetriever) -> RetrieverHandle {
        RetrieverHandle::new(Arc::new(retriever), 6)
    }

    #[tokio::test]
    async fn test_merge_order_is_declared_order_despite_latency() {
        // A is slow, B is fast; A's items must still come first.
        let backends = vec![
            handle(StubRetriever::new("a", &["a1", "a2"]).delayed(Duration::from_millis(50))),
            handle(StubRetriever::new("b", &["b1"])),
        ];

        let merged = fan_out("q", &backends).await.unwrap();
        let contents: Vec<&str> = merged.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, ["a1", "a2", "b1"]);
    }

    #[tokio::test]
    async fn test_single_failure_is_soft() {
        let backends = vec![
            handle(StubRetriever::new("a", &[]).failing()),
            handle(StubRetriever::new("b", &["b1"])),
        ];

        let merged = fan_out("q", &backends).await.unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "b1");
    }

    #[tokio::test]
    async fn test_all_failures_escalate() {
        let backends = vec![
            handle(StubRetriever::new("a", &[]).failing()),
            handle(StubRetriever::new("b", &[]).failing()),
        ];

        let err = fan_out("q", &backends).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_soft_failure() {
        let backends = vec![
            handle(StubRetriever::new("a", &["a1"]).delayed(Duration::from_secs(5)))
                .with_timeout(Duration::from_millis(20)),
            handle(StubRetriever::new("b", &["b1"])),
        ];

        let merged = fan_out("q", &backends).await.unwrap();
        let contents: Vec<&str> = merged.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, ["b1"]);
    }

    #[tokio::test]
    async fn test_duplicates_are_not_deduplicated() {
        let backends = vec![
            handle(StubRetriever::new("a", &["same"])),
            handle(StubRetriever::new("b", &["same"])),
        ];

        let merged = fan_out("q", &backends).await.unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_backend_list_rejected() {
        let err = fan_out("q", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }
}
