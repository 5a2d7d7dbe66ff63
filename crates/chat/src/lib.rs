//! Conversational answering over retrieved evidence.
//!
//! The crate stitches the other layers into one pipeline: serialize the
//! caller-supplied history, condense follow-up questions into standalone
//! ones, fan retrieval out across the configured back-ends, assemble the
//! grounded context, and stream the synthesized answer with model fallback.

pub mod condense;
pub mod history;
pub mod pipeline;
pub mod request;
pub mod synthesize;

#[cfg(test)]
mod testing;

pub use condense::condense_question;
pub use history::serialize_history;
pub use pipeline::ChatPipeline;
pub use request::ChatRequest;
pub use synthesize::{synthesize, AnswerStream};
