//! Prompt crate for the Ragline pipeline.
//!
//! Holds the fixed response and rephrase templates, the positional-tag
//! document formatter, and the context assembler that composes the message
//! sequence sent to the answer model.

pub mod assemble;
pub mod format;
pub mod templates;

// Re-export main types
pub use assemble::PromptEngine;
pub use format::format_docs;
pub use templates::{REPHRASE_TEMPLATE, RESPONSE_TEMPLATE};
