//! Retrieval back-end capability trait.

use crate::types::EvidenceItem;
use ragline_core::AppResult;

/// Trait for retrieval back-ends.
///
/// A back-end is an opaque search service: it receives a query string and
/// returns its own ordered evidence list, ranked highest-relevance-first and
/// already filtered by its similarity threshold. Embedding computation and
/// index internals live behind this seam.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Back-end name, used in logs and failure reporting.
    fn name(&self) -> &str;

    /// Search the back-end.
    ///
    /// # Arguments
    /// * `query` - The query string (raw or condensed question)
    /// * `k` - Number of evidence items to return
    /// * `score_threshold` - Optional minimum similarity score
    ///
    /// # Errors
    /// `AppError::Retrieval` on any back-end failure. A single back-end
    /// failing is recovered by the fan-out as an empty contribution.
    async fn search(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f32>,
    ) -> AppResult<Vec<EvidenceItem>>;
}
