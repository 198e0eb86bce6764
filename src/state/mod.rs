use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, RagSettings};
use crate::llm::build_providers;
use crate::rag::{RagService, SnapshotStore, SqliteSnapshotStore};

pub mod error;

use error::InitializationError;

/// Application state shared by every entry point.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: RagSettings,
    pub rag: Arc<RagService>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Resolves paths and loads the merged configuration
    /// 2. Builds the embedding and generation providers
    /// 3. Opens the snapshot store and restores the last index generation
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        Self::initialize_with(paths).await
    }

    pub async fn initialize_with(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let (embedder, generator) = build_providers(&settings.provider, settings.retry.call_timeout)
            .map_err(|e| InitializationError::Providers(e.into()))?;
        tracing::info!(
            "Using {} embeddings and {} generation",
            embedder.name(),
            generator.name()
        );

        let snapshots: Option<Arc<dyn SnapshotStore>> = if settings.index.persist {
            let store = SqliteSnapshotStore::new(paths.as_ref())
                .await
                .map_err(|e| InitializationError::IndexStore(e.into()))?;
            tracing::info!("Index snapshots stored at {}", store.db_path().display());
            Some(Arc::new(store))
        } else {
            None
        };

        let rag = RagService::build(&settings, embedder, generator, snapshots)
            .map_err(|e| InitializationError::Rag(e.into()))?;

        if let Err(e) = rag.index().restore().await {
            tracing::warn!("Failed to restore index snapshot, starting empty: {}", e);
        }

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            rag: Arc::new(rag),
        }))
    }
}
