//! Retrieval back-end implementations.

pub mod http;

pub use http::HttpRetriever;
