use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize providers: {0}")]
    Providers(#[source] anyhow::Error),

    #[error("Failed to open index store: {0}")]
    IndexStore(#[source] anyhow::Error),

    #[error("Failed to build RAG service: {0}")]
    Rag(#[source] anyhow::Error),
}
