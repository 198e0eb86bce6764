//! Index record types and the snapshot persistence seam.
//!
//! The vector index lives in memory; a `SnapshotStore` can save each
//! published generation and restore the latest one at startup. The primary
//! implementation is `SqliteSnapshotStore` in the `sqlite` module.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::{Chunk, PageType};
use crate::core::errors::RagError;

/// A chunk with its embedding, keyed by `chunk.id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub ingested_at: DateTime<Utc>,
}

/// Optional restrictions applied before ranking.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub source_prefix: Option<String>,
    pub page_type: Option<PageType>,
}

impl SearchFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_source_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.source_prefix = Some(prefix.into());
        self
    }

    pub fn with_page_type(mut self, page_type: PageType) -> Self {
        self.page_type = Some(page_type);
        self
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(prefix) = &self.source_prefix {
            if !chunk.source_url.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(page_type) = self.page_type {
            if chunk.page_type != page_type {
                return false;
            }
        }
        true
    }
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub chunk: Chunk,
    /// cosine similarity clamped to [0, 1]
    pub similarity_score: f32,
    /// 1-based
    pub rank: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub total_sources: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub generation: u64,
    pub dimension: Option<usize>,
    pub page_types: BTreeMap<String, usize>,
}

/// Everything needed to restore one index generation.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub generation: u64,
    pub dimension: Option<usize>,
    pub updated_at: Option<DateTime<Utc>>,
    pub records: Vec<EmbeddingRecord>,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replaces the stored snapshot atomically.
    async fn save(&self, snapshot: &IndexSnapshot) -> Result<(), RagError>;

    /// Returns `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<IndexSnapshot>, RagError>;
}
