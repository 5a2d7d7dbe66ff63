//! Configuration management for the Ragline pipeline.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (ragline.yaml)
//!
//! The configuration declares the ordered retrieval back-end list, the model
//! alternatives table, and the deployment-fixed fallback chain. It is built
//! once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Default number of evidence items requested from a back-end.
fn default_top_k() -> usize {
    6
}

/// Default per-call timeout for retrieval back-ends, in seconds.
fn default_retriever_timeout() -> u64 {
    30
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Explicit API key override (otherwise resolved per provider)
    pub api_key: Option<String>,

    /// Model alternatives, default selection, and fallback chain
    pub models: ModelsConfig,

    /// Retrieval back-ends, in declared merge order
    pub retrievers: Vec<RetrieverConfig>,
}

/// Model selection configuration.
///
/// Alternatives are looked up by name; `default_key` answers unless the
/// request names another alternative. The fallback chain is fixed at
/// deployment time and consulted in order after a retryable failure,
/// independent of which alternative was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Name of the default answer model
    #[serde(rename = "default")]
    pub default_key: String,

    /// Name of the model used to condense follow-up questions.
    /// Typically a cheaper/faster alternative than the answer model.
    #[serde(rename = "rewriteModel")]
    pub rewrite_key: String,

    /// Ordered fallback chain tried after the selected model fails
    #[serde(default)]
    pub fallback: Vec<String>,

    /// Named model alternatives
    pub alternatives: HashMap<String, ModelProviderConfig>,
}

/// Provider-specific model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelProviderConfig {
    /// OpenAI-compatible chat completion endpoint
    OpenAi {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "timeoutSecs")]
        timeout_secs: Option<u64>,
        temperature: Option<f32>,
    },

    /// Ollama chat endpoint
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "timeoutSecs")]
        timeout_secs: Option<u64>,
        temperature: Option<f32>,
    },
}

impl ModelProviderConfig {
    /// Get the model identifier for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi { model, .. } => model,
            Self::Ollama { model, .. } => model,
        }
    }

    /// Get the per-call timeout in seconds, if configured.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            Self::OpenAi { timeout_secs, .. } => *timeout_secs,
            Self::Ollama { timeout_secs, .. } => *timeout_secs,
        }
    }
}

/// One retrieval back-end declaration.
///
/// The order of `retrievers` in the config file is the merge order: evidence
/// from the first back-end always precedes evidence from the second,
/// regardless of response latency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Back-end name, used in logs and soft-failure reporting
    pub name: String,

    /// Search endpoint URL
    pub endpoint: String,

    /// Optional API key environment variable
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: Option<String>,

    /// Number of evidence items to request
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score; items below are filtered by the back-end
    #[serde(rename = "scoreThreshold")]
    pub score_threshold: Option<f32>,

    /// Per-call timeout in seconds
    #[serde(rename = "timeoutSecs", default = "default_retriever_timeout")]
    pub timeout_secs: u64,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    models: Option<ModelsConfig>,
    retrievers: Option<Vec<RetrieverConfig>>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut alternatives = HashMap::new();

        // Local-first default
        alternatives.insert(
            "llama3".to_string(),
            ModelProviderConfig::Ollama {
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3.1".to_string(),
                timeout_secs: Some(120),
                temperature: Some(0.0),
            },
        );

        Self {
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            api_key: None,
            models: ModelsConfig {
                default_key: "llama3".to_string(),
                rewrite_key: "llama3".to_string(),
                fallback: Vec::new(),
                alternatives,
            },
            retrievers: vec![
                RetrieverConfig {
                    name: "knowledge-base".to_string(),
                    endpoint: "http://localhost:9200/search".to_string(),
                    api_key_env: None,
                    top_k: default_top_k(),
                    score_threshold: None,
                    timeout_secs: default_retriever_timeout(),
                },
                RetrieverConfig {
                    name: "discussions".to_string(),
                    endpoint: "http://localhost:9200/discussions/search".to_string(),
                    api_key_env: None,
                    top_k: 4,
                    score_threshold: Some(0.65),
                    timeout_secs: default_retriever_timeout(),
                },
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `RAGLINE_CONFIG`: Path to config file (default: ./ragline.yaml)
    /// - `RAGLINE_MODEL`: Override the default answer model key
    /// - `RAGLINE_API_KEY`: Explicit API key override
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an explicit config file path.
    ///
    /// An explicit path wins over `RAGLINE_CONFIG`; a missing default file is
    /// not an error, a missing explicit one is surfaced by `merge_yaml`.
    pub fn load_from(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();
        config.config_file = config_file;

        if config.config_file.is_none() {
            if let Ok(config_file) = std::env::var("RAGLINE_CONFIG") {
                config.config_file = Some(PathBuf::from(config_file));
            }
        }

        match config.config_file.clone() {
            Some(path) => {
                config = config.merge_yaml(&path)?;
            }
            None => {
                let default_path = PathBuf::from("ragline.yaml");
                if default_path.exists() {
                    config = config.merge_yaml(&default_path)?;
                }
            }
        }

        // Environment variables override YAML config
        if let Ok(model) = std::env::var("RAGLINE_MODEL") {
            config.models.default_key = model;
        }

        config.api_key = std::env::var("RAGLINE_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(models) = config_file.models {
            result.models = models;
        }

        if let Some(retrievers) = config_file.retrievers {
            result.retrievers = retrievers;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the
    /// config file.
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(model) = model {
            self.models.default_key = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Resolve the API key for a model provider configuration.
    ///
    /// An explicit `RAGLINE_API_KEY` wins over the provider's configured
    /// environment variable.
    pub fn resolve_api_key(&self, provider: &ModelProviderConfig) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match provider {
            ModelProviderConfig::OpenAi { api_key_env, .. } => std::env::var(api_key_env).ok(),
            ModelProviderConfig::Ollama { .. } => None,
        }
    }

    /// Validate the configuration.
    ///
    /// Every model key named by the selection policy must exist in the
    /// alternatives table, and at least one retrieval back-end must be
    /// declared.
    pub fn validate(&self) -> AppResult<()> {
        if self.retrievers.is_empty() {
            return Err(AppError::Config(
                "At least one retrieval back-end must be configured".to_string(),
            ));
        }

        let mut required = vec![
            self.models.default_key.as_str(),
            self.models.rewrite_key.as_str(),
        ];
        required.extend(self.models.fallback.iter().map(String::as_str));

        for key in required {
            if !self.models.alternatives.contains_key(key) {
                return Err(AppError::Config(format!(
                    "Model '{}' is not declared in models.alternatives",
                    key
                )));
            }
        }

        for (name, provider) in &self.models.alternatives {
            if let ModelProviderConfig::OpenAi { api_key_env, .. } = provider {
                if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                    return Err(AppError::Config(format!(
                        "Model '{}': API key not found in environment variable {}",
                        name, api_key_env
                    )));
                }
            }
        }

        Ok(())
    }

    /// Log the resolved configuration at startup, masking secrets.
    ///
    /// API keys are never logged; only the environment variable names that
    /// hold them are shown, with a marker for whether they resolved.
    pub fn log_startup(&self) {
        tracing::info!(
            "Models: default='{}', rewrite='{}', fallback={:?}",
            self.models.default_key,
            self.models.rewrite_key,
            self.models.fallback
        );

        for (name, provider) in &self.models.alternatives {
            match provider {
                ModelProviderConfig::OpenAi {
                    api_key_env,
                    model,
                    endpoint,
                    ..
                } => {
                    let key_state = if self.api_key.is_some() || std::env::var(api_key_env).is_ok()
                    {
                        "****"
                    } else {
                        "Not Defined"
                    };
                    tracing::info!(
                        "  model '{}': openai model={} endpoint={:?} {}={}",
                        name,
                        model,
                        endpoint,
                        api_key_env,
                        key_state
                    );
                }
                ModelProviderConfig::Ollama {
                    endpoint, model, ..
                } => {
                    tracing::info!(
                        "  model '{}': ollama model={} endpoint={}",
                        name,
                        model,
                        endpoint
                    );
                }
            }
        }

        for retriever in &self.retrievers {
            tracing::info!(
                "  retriever '{}': endpoint={} topK={} scoreThreshold={:?} timeoutSecs={}",
                retriever.name,
                retriever.endpoint,
                retriever.top_k,
                retriever.score_threshold,
                retriever.timeout_secs
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.models.default_key, "llama3");
        assert_eq!(config.models.rewrite_key, "llama3");
        assert_eq!(config.retrievers.len(), 2);
        assert_eq!(config.retrievers[0].top_k, 6);
        assert_eq!(config.retrievers[1].score_threshold, Some(0.65));
        assert!(!config.verbose);
    }

    #[test]
    fn test_validate_default_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_model_key() {
        let mut config = AppConfig::default();
        config.models.fallback = vec!["gpt-4-turbo".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gpt-4-turbo"));
    }

    #[test]
    fn test_validate_no_retrievers() {
        let mut config = AppConfig::default();
        config.retrievers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config =
            AppConfig::default().with_overrides(Some("gpt-4-turbo".to_string()), None, true, false);

        assert_eq!(config.models.default_key, "gpt-4-turbo");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let yaml = r#"
logging:
  level: debug
models:
  default: answer
  rewriteModel: rewrite
  fallback: [answer]
  alternatives:
    answer:
      endpoint: "http://localhost:11434"
      model: "llama3.1:70b"
      temperature: 0.0
    rewrite:
      endpoint: "http://localhost:11434"
      model: "llama3.1:8b"
retrievers:
  - name: knowledge-base
    endpoint: "http://search.internal/kb"
    topK: 6
  - name: discussions
    endpoint: "http://search.internal/forum"
    topK: 4
    scoreThreshold: 0.65
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = AppConfig::default();
        let merged = config.merge_yaml(&file.path().to_path_buf()).unwrap();

        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert_eq!(merged.models.default_key, "answer");
        assert_eq!(merged.models.rewrite_key, "rewrite");
        assert_eq!(merged.retrievers.len(), 2);
        assert_eq!(merged.retrievers[0].name, "knowledge-base");
        assert_eq!(merged.retrievers[1].score_threshold, Some(0.65));
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn test_openai_provider_parsing() {
        let yaml = r#"
apiKeyEnv: OPENAI_API_KEY
model: gpt-4-turbo
endpoint: "https://example.openai.azure.com"
"#;
        let provider: ModelProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(provider, ModelProviderConfig::OpenAi { .. }));
        assert_eq!(provider.model(), "gpt-4-turbo");
    }
}
