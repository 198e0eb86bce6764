use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::hashing::HashingEmbedder;
use super::openai::OpenAiCompatProvider;
use super::types::{Completion, CompletionRequest};
use crate::core::config::settings::{section_str, section_u64};
use crate::core::errors::RagError;

/// Maps text to fixed-length vectors. `embed_many` must preserve input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// provider name for logs (e.g. "openai", "hashing")
    fn name(&self) -> &str;

    async fn embed_many(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed(&self, input: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_many(&[input.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            RagError::MalformedResponse(format!("{} returned no embedding", self.name()))
        })
    }
}

/// Prompt-in, text-out generation capability.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, RagError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// `/embeddings` on the configured OpenAI-compatible endpoint
    Remote,
    /// deterministic local feature hashing
    Hashing,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub embedding_backend: EmbeddingBackend,
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            embedding_backend: EmbeddingBackend::Remote,
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: 512,
        }
    }
}

impl ProviderSettings {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        let embedding_backend = match section_str(config, "provider", "embedding_backend")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("hashing") | Some("local") => EmbeddingBackend::Hashing,
            Some(other) if other != "openai" && other != "remote" => {
                tracing::warn!("Unknown embedding backend '{}', using remote", other);
                EmbeddingBackend::Remote
            }
            _ => EmbeddingBackend::Remote,
        };

        Self {
            embedding_backend,
            base_url: section_str(config, "provider", "base_url").unwrap_or(defaults.base_url),
            api_key: section_str(config, "provider", "api_key"),
            chat_model: section_str(config, "provider", "chat_model").unwrap_or(defaults.chat_model),
            embedding_model: section_str(config, "provider", "embedding_model")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: section_u64(config, "provider", "embedding_dimension")
                .map(|v| v as usize)
                .unwrap_or(defaults.embedding_dimension),
        }
    }
}

/// Builds the embedding and generation capabilities described by `settings`.
pub fn build_providers(
    settings: &ProviderSettings,
    request_timeout: std::time::Duration,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn GenerationProvider>), RagError> {
    let remote = Arc::new(OpenAiCompatProvider::new(settings, request_timeout)?);

    let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding_backend {
        EmbeddingBackend::Remote => remote.clone(),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(settings.embedding_dimension)),
    };

    Ok((embedder, remote))
}
