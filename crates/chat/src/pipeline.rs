//! Pipeline orchestrator.
//!
//! Wires history serialization, the condense/retrieve branch decision,
//! retrieval fan-out, document formatting, context assembly, and response
//! synthesis into one request-scoped execution path.

use crate::condense::condense_question;
use crate::history::serialize_history;
use crate::request::ChatRequest;
use crate::synthesize::{synthesize, AnswerStream};
use ragline_core::{AppConfig, AppError, AppResult};
use ragline_llm::ModelRegistry;
use ragline_prompt::{format_docs, PromptEngine};
use ragline_retrieval::{build_retrievers, fan_out, RetrieverHandle};
use std::sync::Arc;

/// The conversational answering pipeline.
///
/// Holds the process-wide capability handles (model registry, ordered
/// retriever list, prompt engine), all constructed once at startup and never
/// mutated. Every `answer` call owns its intermediate data exclusively, so a
/// failure in one request cannot affect concurrently in-flight requests.
pub struct ChatPipeline {
    registry: Arc<ModelRegistry>,
    retrievers: Vec<RetrieverHandle>,
    prompts: PromptEngine,
}

impl ChatPipeline {
    /// Create a pipeline from explicit capability handles.
    pub fn new(
        registry: Arc<ModelRegistry>,
        retrievers: Vec<RetrieverHandle>,
    ) -> AppResult<Self> {
        if retrievers.is_empty() {
            return Err(AppError::Config(
                "At least one retrieval back-end must be configured".to_string(),
            ));
        }

        Ok(Self {
            registry,
            retrievers,
            prompts: PromptEngine::new()?,
        })
    }

    /// Create a pipeline from application configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let registry = Arc::new(ModelRegistry::from_config(config)?);
        let retrievers = build_retrievers(&config.retrievers)?;
        Self::new(registry, retrievers)
    }

    /// The model registry backing this pipeline.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Answer a chat request with a stream of text fragments.
    ///
    /// `model` optionally names a registry alternative to answer with; the
    /// fallback chain after it stays as configured.
    ///
    /// Stage order: validate and serialize history, resolve the model chain,
    /// branch on history (condense the follow-up when history exists), fan
    /// out retrieval, format evidence, assemble the context, and open the
    /// answer stream.
    ///
    /// # Errors
    /// - `Validation`: malformed request, before any external call
    /// - `UpstreamUnavailable`: every retrieval back-end failed; no model
    ///   call is made
    /// - `ModelUnavailable`: condenser failed, or the answer fallback chain
    ///   is exhausted
    pub async fn answer(
        &self,
        request: &ChatRequest,
        model: Option<&str>,
    ) -> AppResult<AnswerStream> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("question must not be empty".to_string()));
        }

        let history = serialize_history(request)?;
        let chain = self.registry.chain_for(model)?;

        tracing::info!(
            "Answering question ({} prior message(s), model '{}')",
            history.len(),
            chain[0].name
        );

        // Branch on request shape: with history, the follow-up must be
        // condensed into a standalone question before retrieval.
        let query = if history.is_empty() {
            question.to_string()
        } else {
            condense_question(&self.registry.rewrite(), &self.prompts, &history, question).await?
        };

        let evidence = fan_out(&query, &self.retrievers).await?;
        let formatted = format_docs(&evidence);
        let messages = self.prompts.assemble_context(&formatted, &history, question)?;

        synthesize(&chain, messages).await
    }
}
