//! HTTP retrieval back-end client.
//!
//! Talks to a search service over a small JSON protocol: the service owns
//! embedding computation, ranking, and threshold filtering, and returns its
//! hits highest-relevance-first.

use crate::retriever::Retriever;
use crate::types::EvidenceItem;
use ragline_core::config::RetrieverConfig;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Search request body.
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    k: usize,
    #[serde(rename = "scoreThreshold", skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f32>,
}

/// Search response body.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    content: String,
    #[serde(default)]
    source: Option<String>,
}

/// HTTP search back-end.
pub struct HttpRetriever {
    /// Declared back-end name
    name: String,

    /// Search endpoint URL
    endpoint: String,

    /// Optional API key sent as a bearer token
    api_key: Option<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpRetriever {
    /// Create a new HTTP retriever.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Attach an API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Create a retriever from a back-end declaration, resolving the API key
    /// environment variable when one is configured.
    pub fn from_config(config: &RetrieverConfig) -> AppResult<Self> {
        let mut retriever = Self::new(&config.name, &config.endpoint);

        if let Some(ref env_var) = config.api_key_env {
            let key = std::env::var(env_var).map_err(|_| {
                AppError::Config(format!(
                    "Retriever '{}': API key not found in environment variable {}",
                    config.name, env_var
                ))
            })?;
            retriever = retriever.with_api_key(key);
        }

        Ok(retriever)
    }
}

#[async_trait::async_trait]
impl Retriever for HttpRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f32>,
    ) -> AppResult<Vec<EvidenceItem>> {
        tracing::debug!(
            "Searching back-end '{}' (k={}, threshold={:?})",
            self.name,
            k,
            score_threshold
        );

        let body = SearchRequest {
            query,
            k,
            score_threshold,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            AppError::Retrieval(format!("Back-end '{}' request failed: {}", self.name, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Retrieval(format!(
                "Back-end '{}' error ({}): {}",
                self.name, status, error_text
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Back-end '{}' sent invalid response: {}", self.name, e))
        })?;

        let items = parsed
            .hits
            .into_iter()
            .map(|hit| EvidenceItem {
                content: hit.content,
                source_label: hit.source,
            })
            .collect::<Vec<_>>();

        tracing::debug!("Back-end '{}' returned {} items", self.name, items.len());

        Ok(items)
    }
}
