//! Evidence types.

use serde::{Deserialize, Serialize};

/// One retrieved passage used to ground the model's answer.
///
/// Identity for citation purposes is the item's position in the final merged
/// sequence, not any persistent id carried by the back-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Retrieved text
    pub content: String,

    /// Provenance label (e.g., a document title or URL), when the back-end
    /// provides one
    pub source_label: Option<String>,
}

impl EvidenceItem {
    /// Create an evidence item without a source label.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_label: None,
        }
    }

    /// Attach a source label.
    pub fn with_source(mut self, label: impl Into<String>) -> Self {
        self.source_label = Some(label.into());
        self
    }
}
