//! Document formatter.
//!
//! Turns the merged evidence sequence into a citation-indexed text block.
//! Tag `i` always denotes the item at index `i` of the merged sequence fed to
//! the model; the formatter must never reorder or drop items.

use ragline_retrieval::EvidenceItem;

/// Format evidence items into `<doc id='i'>` blocks joined by newlines.
///
/// The zero-based tag is the item's citation anchor. A source label, when
/// present, is embedded as an attribute for traceability. Empty input yields
/// an empty string - the synthesizer still runs and the response template
/// handles the no-evidence case.
pub fn format_docs(items: &[EvidenceItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match &item.source_label {
            Some(label) => format!("<doc id='{}' source='{}'>{}</doc>", i, label, item.content),
            None => format!("<doc id='{}'>{}</doc>", i, item.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
