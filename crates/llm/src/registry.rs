//! Named-alternative model registry.
//!
//! Maps configuration keys to concrete model handles, with one designated
//! default, a designated rewrite model for question condensation, and a
//! deployment-fixed ordered fallback chain. The registry is built once at
//! startup from the model alternatives table and never mutated; requests may
//! name an alternative, which replaces only the head of the chain.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use ragline_core::config::{AppConfig, ModelProviderConfig};
use ragline_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-call timeout applied when a model declares none.
const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// A resolved model alternative: provider client plus generation defaults.
#[derive(Clone)]
pub struct ModelHandle {
    /// Registry key (e.g., "gpt-4-turbo")
    pub name: String,

    /// Provider-side model identifier
    pub model: String,

    /// Default sampling temperature
    pub temperature: Option<f32>,

    /// Per-call timeout
    pub timeout: Duration,

    /// Provider client
    pub client: Arc<dyn LlmClient>,
}

impl ModelHandle {
    /// Create a handle from its parts. Used directly by tests; production
    /// handles come from `ModelRegistry::from_config`.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            temperature: None,
            timeout: DEFAULT_MODEL_TIMEOUT,
            client,
        }
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("provider", &self.client.provider_name())
            .finish()
    }
}

/// Lookup table of model alternatives plus the selection policy.
pub struct ModelRegistry {
    handles: HashMap<String, Arc<ModelHandle>>,
    default_key: String,
    rewrite_key: String,
    fallback: Vec<String>,
}

impl ModelRegistry {
    /// Build a registry from explicit handles.
    ///
    /// Every key referenced by `default_key`, `rewrite_key`, or `fallback`
    /// must be present among `handles`.
    pub fn new(
        handles: Vec<ModelHandle>,
        default_key: impl Into<String>,
        rewrite_key: impl Into<String>,
        fallback: Vec<String>,
    ) -> AppResult<Self> {
        let registry = Self {
            handles: handles
                .into_iter()
                .map(|h| (h.name.clone(), Arc::new(h)))
                .collect(),
            default_key: default_key.into(),
            rewrite_key: rewrite_key.into(),
            fallback,
        };

        let mut required = vec![registry.default_key.clone(), registry.rewrite_key.clone()];
        required.extend(registry.fallback.iter().cloned());
        for key in required {
            if !registry.handles.contains_key(&key) {
                return Err(AppError::Config(format!(
                    "Model '{}' referenced but not registered",
                    key
                )));
            }
        }

        Ok(registry)
    }

    /// Build a registry from application configuration.
    ///
    /// This resolves each alternative to a provider client:
    /// 1. Matches the provider shape (Ollama vs OpenAI-compatible)
    /// 2. Resolves required secrets from environment variables
    /// 3. Creates the client implementation
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let mut handles = Vec::new();

        for (name, provider) in &config.models.alternatives {
            let client: Arc<dyn LlmClient> = match provider {
                ModelProviderConfig::Ollama { endpoint, .. } => {
                    Arc::new(OllamaClient::with_base_url(endpoint))
                }
                ModelProviderConfig::OpenAi { endpoint, .. } => {
                    let api_key = config.resolve_api_key(provider).ok_or_else(|| {
                        AppError::Config(format!("Model '{}': no API key available", name))
                    })?;
                    match endpoint {
                        Some(endpoint) => Arc::new(OpenAiClient::with_base_url(endpoint, api_key)),
                        None => Arc::new(OpenAiClient::new(api_key)),
                    }
                }
            };

            let timeout = provider
                .timeout_secs()
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_MODEL_TIMEOUT);

            let temperature = match provider {
                ModelProviderConfig::OpenAi { temperature, .. } => *temperature,
                ModelProviderConfig::Ollama { temperature, .. } => *temperature,
            };

            let mut handle =
                ModelHandle::new(name.clone(), provider.model(), client).with_timeout(timeout);
            handle.temperature = temperature;
            handles.push(handle);
        }

        Self::new(
            handles,
            config.models.default_key.clone(),
            config.models.rewrite_key.clone(),
            config.models.fallback.clone(),
        )
    }

    /// Get the handle used to condense follow-up questions.
    pub fn rewrite(&self) -> Arc<ModelHandle> {
        // Key existence is checked at construction
        Arc::clone(&self.handles[&self.rewrite_key])
    }

    /// Resolve the answer-model chain for a request.
    ///
    /// The head is the named alternative when given, otherwise the default.
    /// The fixed fallback chain follows, independent of which alternative was
    /// selected; the head is not repeated.
    pub fn chain_for(&self, selector: Option<&str>) -> AppResult<Vec<Arc<ModelHandle>>> {
        let head_key = selector.unwrap_or(&self.default_key);

        let head = self.handles.get(head_key).ok_or_else(|| {
            AppError::Validation(format!("Unknown model alternative: '{}'", head_key))
        })?;

        let mut chain = vec![Arc::clone(head)];
        for key in &self.fallback {
            if key != head_key {
                chain.push(Arc::clone(&self.handles[key]));
            }
        }

        Ok(chain)
    }

    /// Registry keys in sorted order, for display.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The default answer-model key.
    pub fn default_key(&self) -> &str {
        &self.default_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LlmRequest, LlmResponse, LlmStream, LlmUsage};

    struct NullClient;

    #[async_trait::async_trait]
    impl LlmClient for NullClient {
        fn provider_name(&self) -> &str {
            "null"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            Ok(LlmResponse {
                content: String::new(),
                model: "null".to_string(),
                usage: LlmUsage::default(),
                done: true,
            })
        }

        async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    fn handle(name: &str) -> ModelHandle {
        ModelHandle::new(name, name, Arc::new(NullClient))
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::new(
            vec![handle("answer"), handle("rewrite"), handle("backup")],
            "answer",
            "rewrite",
            vec!["backup".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_chain_default() {
        let registry = registry();
        let chain = registry.chain_for(None).unwrap();
        let keys: Vec<&str> = chain.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(keys, ["answer", "backup"]);
    }

    #[test]
    fn test_chain_named_alternative() {
        let registry = registry();
        let chain = registry.chain_for(Some("rewrite")).unwrap();
        let keys: Vec<&str> = chain.iter().map(|h| h.name.as_str()).collect();
        // Fallback chain is fixed regardless of the selected head
        assert_eq!(keys, ["rewrite", "backup"]);
    }

    #[test]
    fn test_chain_head_not_repeated() {
        let registry = registry();
        let chain = registry.chain_for(Some("backup")).unwrap();
        let keys: Vec<&str> = chain.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(keys, ["backup"]);
    }

    #[test]
    fn test_unknown_selector_is_validation_error() {
        let registry = registry();
        let err = registry.chain_for(Some("missing")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_missing_fallback_key_rejected() {
        let result = ModelRegistry::new(
            vec![handle("answer")],
            "answer",
            "answer",
            vec!["ghost".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rewrite_handle() {
        let registry = registry();
        assert_eq!(registry.rewrite().name, "rewrite");
    }

    #[test]
    fn test_names_sorted() {
        let registry = registry();
        assert_eq!(registry.names(), ["answer", "backup", "rewrite"]);
    }
}
