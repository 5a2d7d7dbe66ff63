//! Retrieval crate for the Ragline pipeline.
//!
//! Defines the evidence types, the retrieval back-end capability trait, an
//! HTTP search provider, and the concurrent fan-out/merge stage. Merge order
//! is always the declared back-end order, which is what keeps citation tags
//! stable downstream.

pub mod fanout;
pub mod providers;
pub mod retriever;
pub mod types;

// Re-export main types
pub use fanout::{build_retrievers, fan_out, RetrieverHandle};
pub use providers::HttpRetriever;
pub use retriever::Retriever;
pub use types::EvidenceItem;
