//! Command handlers for the Ragline CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod chat;
pub mod models;

// Re-export command types for convenience
pub use chat::ChatCommand;
pub use models::ModelsCommand;
