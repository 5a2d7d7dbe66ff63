//! LLM integration crate for the Ragline pipeline.
//!
//! This crate provides a provider-agnostic abstraction for chat-style
//! language model generation, with streaming support and a named-alternative
//! registry driving the primary/fallback model policy.
//!
//! # Providers
//! - **Ollama**: local LLM runtime (default)
//! - **OpenAI-compatible**: any chat-completions endpoint
//!
//! # Example
//! ```no_run
//! use ragline_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::human("Hello!")], "llama3.1");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod providers;
pub mod registry;

// Re-export main types
pub use client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage, Role,
};
pub use providers::{OllamaClient, OpenAiClient};
pub use registry::{ModelHandle, ModelRegistry};
