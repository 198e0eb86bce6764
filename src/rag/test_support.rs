//! Scripted providers and fixtures shared by the rag tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::engine::{Chunk, PageType};
use crate::core::errors::RagError;
use crate::llm::{
    Completion, CompletionRequest, EmbeddingProvider, GenerationProvider, HashingEmbedder,
    RetryPolicy, TokenUsage,
};

pub const TEST_DIMENSION: usize = 512;

pub fn hashing() -> Arc<HashingEmbedder> {
    Arc::new(HashingEmbedder::new(TEST_DIMENSION))
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::immediate(2, Duration::from_secs(2))
}

pub fn chunk(id: &str, url: &str, position: usize, text: &str) -> Chunk {
    let length = text.chars().count();
    Chunk {
        id: id.to_string(),
        text: text.to_string(),
        source_url: url.to_string(),
        source_title: format!("Title of {}", id),
        position,
        char_length: length,
        start_offset: 0,
        end_offset: length,
        page_type: PageType::from_url(url),
        fetched_at: Utc::now(),
    }
}

/// Hashing embedder that fails permanently for any input containing `marker`.
pub struct MarkerFailEmbedder {
    inner: HashingEmbedder,
    marker: String,
}

impl MarkerFailEmbedder {
    pub fn new(marker: &str) -> Self {
        Self {
            inner: HashingEmbedder::new(TEST_DIMENSION),
            marker: marker.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MarkerFailEmbedder {
    fn name(&self) -> &str {
        "marker-fail"
    }

    async fn embed_many(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.iter().any(|text| text.contains(&self.marker)) {
            return Err(RagError::Embedding("scripted embedding failure".into()));
        }
        self.inner.embed_many(inputs).await
    }
}

/// Returns 8-dimensional vectors for texts containing "wide", 4 otherwise.
pub struct FixedDimensionEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedDimensionEmbedder {
    fn name(&self) -> &str {
        "fixed-dimension"
    }

    async fn embed_many(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(inputs
            .iter()
            .map(|text| {
                let dimension = if text.contains("wide") { 8 } else { 4 };
                let mut vector = vec![0.0; dimension];
                vector[0] = 1.0;
                vector
            })
            .collect())
    }
}

/// Hashing embedder that sleeps before every call.
pub struct SlowEmbedder {
    inner: HashingEmbedder,
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: HashingEmbedder::new(TEST_DIMENSION),
            delay,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    fn name(&self) -> &str {
        "slow"
    }

    async fn embed_many(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_many(inputs).await
    }
}

/// Hashing embedder that fails every call with a transient error once taken down.
pub struct OutageEmbedder {
    inner: HashingEmbedder,
    down: AtomicBool,
    calls: AtomicUsize,
}

impl OutageEmbedder {
    pub fn new() -> Self {
        Self {
            inner: HashingEmbedder::new(TEST_DIMENSION),
            down: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for OutageEmbedder {
    fn name(&self) -> &str {
        "outage"
    }

    async fn embed_many(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(RagError::Unavailable("connection refused".into()));
        }
        self.inner.embed_many(inputs).await
    }
}

/// Hashing embedder whose first `failures` calls fail with a transient error.
pub struct FlakyEmbedder {
    inner: HashingEmbedder,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(TEST_DIMENSION),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn embed_many(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(RagError::Unavailable("connection reset".into()));
        }
        self.inner.embed_many(inputs).await
    }
}

/// Generation provider replaying queued responses, then a default reply.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, RagError>>>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn then(self, response: Result<String, RagError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt);

        let next = self.responses.lock().unwrap().pop_front();
        let text = match next {
            Some(response) => response?,
            None => self.default_reply.clone(),
        };
        Ok(Completion {
            text,
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }),
        })
    }
}
