pub mod hashing;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod types;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiCompatProvider;
pub use provider::{
    build_providers, EmbeddingBackend, EmbeddingProvider, GenerationProvider, ProviderSettings,
};
pub use retry::RetryPolicy;
pub use types::{Completion, CompletionRequest, TokenUsage};
