//! Test doubles for the pipeline's capability seams.

use ragline_core::{AppError, AppResult};
use ragline_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use ragline_retrieval::{EvidenceItem, Retriever};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum StreamBehavior {
    Fragments(Vec<String>),
    FailSetup(String),
    FailBeforeFirst(String),
    FailAfter(Vec<String>, String),
}

/// Scriptable LLM client recording every request it receives.
pub struct MockLlm {
    name: String,
    complete_result: Result<String, String>,
    stream_behavior: StreamBehavior,
    complete_calls: Arc<AtomicUsize>,
    stream_calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
}

impl MockLlm {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            complete_result: Ok("ok".to_string()),
            stream_behavior: StreamBehavior::Fragments(vec!["ok".to_string()]),
            complete_calls: Arc::new(AtomicUsize::new(0)),
            stream_calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Respond to `complete` with the given content.
    pub fn completing(mut self, content: &str) -> Self {
        self.complete_result = Ok(content.to_string());
        self
    }

    /// Fail every `complete` call.
    pub fn failing_complete(mut self, message: &str) -> Self {
        self.complete_result = Err(message.to_string());
        self
    }

    /// Stream the given fragments, then a clean done marker.
    pub fn streaming(mut self, fragments: &[&str]) -> Self {
        self.stream_behavior =
            StreamBehavior::Fragments(fragments.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Fail the `stream` call itself.
    pub fn failing_stream_setup(mut self, message: &str) -> Self {
        self.stream_behavior = StreamBehavior::FailSetup(message.to_string());
        self
    }

    /// Open the stream, then error before any fragment.
    pub fn failing_before_first_fragment(mut self, message: &str) -> Self {
        self.stream_behavior = StreamBehavior::FailBeforeFirst(message.to_string());
        self
    }

    /// Emit the given fragments, then error mid-stream.
    pub fn failing_after_fragments(mut self, fragments: &[&str], message: &str) -> Self {
        self.stream_behavior = StreamBehavior::FailAfter(
            fragments.iter().map(|s| s.to_string()).collect(),
            message.to_string(),
        );
        self
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn stream_call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stream_calls)
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn fragment_chunk(&self, content: &str) -> LlmStreamChunk {
        LlmStreamChunk {
            content: content.to_string(),
            model: self.name.clone(),
            done: false,
            usage: None,
        }
    }

    fn done_chunk(&self) -> LlmStreamChunk {
        LlmStreamChunk {
            content: String::new(),
            model: self.name.clone(),
            done: true,
            usage: Some(LlmUsage::default()),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match &self.complete_result {
            Ok(content) => Ok(LlmResponse {
                content: content.clone(),
                model: self.name.clone(),
                usage: LlmUsage::default(),
                done: true,
            }),
            Err(message) => Err(AppError::Model(message.clone())),
        }
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match &self.stream_behavior {
            StreamBehavior::FailSetup(message) => Err(AppError::Model(message.clone())),
            StreamBehavior::FailBeforeFirst(message) => {
                let items: Vec<AppResult<LlmStreamChunk>> =
                    vec![Err(AppError::Model(message.clone()))];
                Ok(Box::pin(futures::stream::iter(items)))
            }
            StreamBehavior::Fragments(fragments) => {
                let mut items: Vec<AppResult<LlmStreamChunk>> = fragments
                    .iter()
                    .map(|f| Ok(self.fragment_chunk(f)))
                    .collect();
                items.push(Ok(self.done_chunk()));
                Ok(Box::pin(futures::stream::iter(items)))
            }
            StreamBehavior::FailAfter(fragments, message) => {
                let mut items: Vec<AppResult<LlmStreamChunk>> = fragments
                    .iter()
                    .map(|f| Ok(self.fragment_chunk(f)))
                    .collect();
                items.push(Err(AppError::Model(message.clone())));
                Ok(Box::pin(futures::stream::iter(items)))
            }
        }
    }
}

/// Scriptable retrieval back-end recording every query it receives.
pub struct MockRetriever {
    name: String,
    items: Vec<EvidenceItem>,
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockRetriever {
    pub fn new(name: &str, contents: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            items: contents.iter().map(|c| EvidenceItem::new(*c)).collect(),
            fail: false,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn query_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait::async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        _k: usize,
        _score_threshold: Option<f32>,
    ) -> AppResult<Vec<EvidenceItem>> {
        self.queries.lock().unwrap().push(query.to_string());

        if self.fail {
            return Err(AppError::Retrieval("mock back-end failure".to_string()));
        }

        Ok(self.items.clone())
    }
}
