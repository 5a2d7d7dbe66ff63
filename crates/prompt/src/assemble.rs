//! Context assembler: renders the fixed templates and composes the message
//! sequence sent to the answer model.

use crate::templates::{REPHRASE_TEMPLATE, RESPONSE_TEMPLATE};
use handlebars::Handlebars;
use ragline_core::{AppError, AppResult};
use ragline_llm::{ChatMessage, Role};
use serde_json::json;

/// Template engine for the pipeline's two prompts.
///
/// Templates are registered once at construction; per-request content enters
/// only as render-time data, so user content cannot break out of its slot.
pub struct PromptEngine {
    handlebars: Handlebars<'static>,
}

impl PromptEngine {
    /// Create an engine with both templates registered.
    pub fn new() -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Plain-text prompts; HTML escaping would corrupt the doc tags
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string("response", RESPONSE_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register response template: {}", e)))?;

        handlebars
            .register_template_string("rephrase", REPHRASE_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register rephrase template: {}", e)))?;

        Ok(Self { handlebars })
    }

    /// Render the answer-generation system instruction with the formatted
    /// evidence substituted into its context slot.
    pub fn render_response_system(&self, formatted_docs: &str) -> AppResult<String> {
        self.handlebars
            .render("response", &json!({ "context": formatted_docs }))
            .map_err(|e| AppError::Prompt(format!("Failed to render response template: {}", e)))
    }

    /// Render the condenser prompt from the history transcript and the raw
    /// follow-up question.
    pub fn render_rephrase(&self, history: &[ChatMessage], question: &str) -> AppResult<String> {
        self.handlebars
            .render(
                "rephrase",
                &json!({
                    "chat_history": transcript(history),
                    "question": question,
                }),
            )
            .map_err(|e| AppError::Prompt(format!("Failed to render rephrase template: {}", e)))
    }

    /// Compose the full message sequence for answer generation:
    /// system instruction (with evidence), prior turns in order, then the
    /// current question as the final human message.
    pub fn assemble_context(
        &self,
        formatted_docs: &str,
        history: &[ChatMessage],
        question: &str,
    ) -> AppResult<Vec<ChatMessage>> {
        let system = self.render_response_system(formatted_docs)?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::human(question));

        tracing::debug!(
            "Assembled context: {} message(s), {} bytes of evidence",
            messages.len(),
            formatted_docs.len()
        );

        Ok(messages)
    }
}

/// Render prior turns as a plain transcript for the rephrase prompt.
fn transcript(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| match m.role {
            Role::Human => format!("Human: {}", m.content),
            Role::Ai => format!("Assistant: {}", m.content),
            Role::System => format!("System: {}", m.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_system_contains_context_verbatim_once() {
        let engine = PromptEngine::new().unwrap();
        let formatted = "<doc id='0'>X is a widget.</doc>";
        let system = engine.render_response_system(formatted).unwrap();

        assert_eq!(system.matches(formatted).count(), 1);
        assert!(system.contains("[^number]"));
    }

    #[test]
    fn test_empty_context_still_renders() {
        let engine = PromptEngine::new().unwrap();
        let system = engine.render_response_system("").unwrap();
        assert!(system.contains("<context>\n\n</context>"));
    }

    #[test]
    fn test_question_is_data_not_template() {
        let engine = PromptEngine::new().unwrap();
        // A question carrying template syntax must come through unchanged,
        // not be evaluated.
        let question = "What does {{context}} mean?";
        let messages = engine.assemble_context("", &[], question).unwrap();
        assert_eq!(messages.last().unwrap().content, question);
    }

    #[test]
    fn test_assemble_order() {
        let engine = PromptEngine::new().unwrap();
        let history = vec![ChatMessage::human("Hi"), ChatMessage::ai("Hello!")];
        let messages = engine
            .assemble_context("<doc id='0'>fact</doc>", &history, "And then?")
            .unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Hi");
        assert_eq!(messages[2].content, "Hello!");
        assert_eq!(messages[3].role, Role::Human);
        assert_eq!(messages[3].content, "And then?");
    }

    #[test]
    fn test_rephrase_prompt() {
        let engine = PromptEngine::new().unwrap();
        let history = vec![
            ChatMessage::human("What is Atlas?"),
            ChatMessage::ai("A collaboration platform."),
        ];
        let prompt = engine.render_rephrase(&history, "Who builds it?").unwrap();

        assert!(prompt.contains("Human: What is Atlas?"));
        assert!(prompt.contains("Assistant: A collaboration platform."));
        assert!(prompt.contains("Follow Up Input: Who builds it?"));
        assert!(prompt.ends_with("Standalone Question:"));
    }

    #[test]
    fn test_transcript_roles() {
        let history = vec![ChatMessage::human("a"), ChatMessage::ai("b")];
        assert_eq!(transcript(&history), "Human: a\nAssistant: b");
    }
}
