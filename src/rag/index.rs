//! In-memory vector index with generation swapping.
//!
//! The active generation sits behind `RwLock<Arc<IndexGeneration>>`. Readers
//! clone the `Arc` once per search and score that snapshot; writers are
//! serialized by a mutex, build the next generation off to the side and
//! publish it with a single pointer swap. A search therefore always sees one
//! complete generation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::engine::Chunk;
use super::store::{EmbeddingRecord, EvidenceItem, IndexSnapshot, IndexStats, SearchFilter, SnapshotStore};
use crate::core::config::settings::{section_bool, section_u64};
use crate::core::errors::RagError;
use crate::llm::{EmbeddingProvider, RetryPolicy};

#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// texts per embedding call
    pub embed_batch_size: usize,
    /// embedding calls in flight during upsert/rebuild
    pub embed_concurrency: usize,
    /// save every published generation through the snapshot store
    pub persist: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            embed_batch_size: 32,
            embed_concurrency: 4,
            persist: true,
        }
    }
}

impl IndexConfig {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        Self {
            embed_batch_size: section_u64(config, "index", "embed_batch_size")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.embed_batch_size),
            embed_concurrency: section_u64(config, "index", "embed_concurrency")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.embed_concurrency),
            persist: section_bool(config, "index", "persist").unwrap_or(defaults.persist),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct IndexGeneration {
    number: u64,
    dimension: Option<usize>,
    updated_at: Option<DateTime<Utc>>,
    records: HashMap<String, EmbeddingRecord>,
}

impl IndexGeneration {
    fn empty(number: u64) -> Self {
        Self {
            number,
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    fn successor(&self) -> Self {
        Self {
            number: self.number + 1,
            ..self.clone()
        }
    }

    /// Validates every vector before touching the records, so a rejected
    /// batch leaves the generation unchanged.
    fn insert_batch(&mut self, batch: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<(), RagError> {
        if vectors.len() != batch.len() {
            return Err(RagError::MalformedResponse(format!(
                "received {} embeddings for {} chunks",
                vectors.len(),
                batch.len()
            )));
        }

        let mut dimension = self.dimension;
        for vector in &vectors {
            if vector.is_empty() {
                return Err(RagError::Embedding("provider returned an empty vector".into()));
            }
            match dimension {
                Some(expected) if expected != vector.len() => {
                    return Err(RagError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
                None => dimension = Some(vector.len()),
            }
        }

        let now = Utc::now();
        for (chunk, vector) in batch.iter().zip(vectors) {
            self.records.insert(
                chunk.id.clone(),
                EmbeddingRecord {
                    chunk: chunk.clone(),
                    vector,
                    ingested_at: now,
                },
            );
        }
        self.dimension = dimension;
        self.updated_at = Some(now);
        Ok(())
    }

    fn stats(&self) -> IndexStats {
        let mut sources = HashSet::new();
        let mut page_types = BTreeMap::new();
        for record in self.records.values() {
            sources.insert(record.chunk.source_url.as_str());
            *page_types
                .entry(record.chunk.page_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        IndexStats {
            total_chunks: self.records.len(),
            total_sources: sources.len(),
            last_updated: self.updated_at,
            generation: self.number,
            dimension: self.dimension,
            page_types,
        }
    }

    fn to_snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            generation: self.number,
            dimension: self.dimension,
            updated_at: self.updated_at,
            records: self.records.values().cloned().collect(),
        }
    }

    fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            number: snapshot.generation,
            dimension: snapshot.dimension,
            updated_at: snapshot.updated_at,
            records: snapshot
                .records
                .into_iter()
                .map(|record| (record.chunk.id.clone(), record))
                .collect(),
        }
    }
}

pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    config: IndexConfig,
    active: RwLock<Arc<IndexGeneration>>,
    writer: Mutex<()>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, retry: RetryPolicy, config: IndexConfig) -> Self {
        Self {
            embedder,
            retry,
            config,
            active: RwLock::new(Arc::new(IndexGeneration::default())),
            writer: Mutex::new(()),
            snapshots: None,
        }
    }

    pub fn with_snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Loads the last saved generation, if any. Returns the restored record count.
    pub async fn restore(&self) -> Result<usize, RagError> {
        let Some(store) = &self.snapshots else {
            return Ok(0);
        };
        let Some(snapshot) = store.load().await? else {
            return Ok(0);
        };

        let _writer = self.writer.lock().await;
        let generation = IndexGeneration::from_snapshot(snapshot);
        let count = generation.records.len();
        *self.active.write().await = Arc::new(generation);
        tracing::info!("Restored {} index records from snapshot", count);
        Ok(count)
    }

    async fn current(&self) -> Arc<IndexGeneration> {
        self.active.read().await.clone()
    }

    async fn publish(&self, generation: IndexGeneration) {
        let generation = Arc::new(generation);
        *self.active.write().await = generation.clone();
        tracing::debug!(
            "Published index generation {} ({} records)",
            generation.number,
            generation.records.len()
        );

        if let Some(store) = &self.snapshots {
            if let Err(e) = store.save(&generation.to_snapshot()).await {
                tracing::warn!("Failed to persist index generation {}: {}", generation.number, e);
            }
        }
    }

    /// One owned embedding future per batch, so the stream holds no borrows.
    fn embed_batches(
        &self,
        batches: &[&[Chunk]],
    ) -> impl Stream<Item = Result<Vec<Vec<f32>>, RagError>> + Send + 'static {
        let pending: Vec<_> = batches
            .iter()
            .map(|batch| {
                let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
                embed_texts(self.embedder.clone(), self.retry.clone(), texts)
            })
            .collect();
        stream::iter(pending).buffered(self.config.embed_concurrency.max(1))
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let embedder = &self.embedder;
        let vector = self
            .retry
            .run("embed query", move || embedder.embed(query))
            .await?;
        if vector.is_empty() {
            return Err(RagError::Embedding("provider returned an empty query vector".into()));
        }
        Ok(vector)
    }

    /// Embeds and stores `chunks`, replacing records with the same id.
    ///
    /// Batches are applied to one working generation, which is published
    /// and persisted once. When a batch fails, the batches before it are
    /// still published and the error lists the ids that were not.
    pub async fn upsert(&self, chunks: &[Chunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let _writer = self.writer.lock().await;
        let batches: Vec<&[Chunk]> = chunks.chunks(self.config.embed_batch_size.max(1)).collect();
        let mut results = std::pin::pin!(self.embed_batches(&batches));
        let mut generation = self.current().await.successor();

        let mut committed = 0usize;
        let mut next_batch = 0usize;
        let mut failure = None;

        while let Some(result) = results.next().await {
            let batch = batches[next_batch];
            match result.and_then(|vectors| generation.insert_batch(batch, vectors)) {
                Ok(()) => {
                    committed += batch.len();
                    next_batch += 1;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        drop(results);

        if committed > 0 {
            self.publish(generation).await;
        }

        if let Some(err) = failure {
            let uncommitted: Vec<String> = batches[next_batch..]
                .iter()
                .flat_map(|batch| batch.iter().map(|chunk| chunk.id.clone()))
                .collect();
            tracing::warn!(
                "Upsert stopped after {} chunks, {} not committed: {}",
                committed,
                uncommitted.len(),
                err
            );
            return Err(RagError::PartialUpsert {
                committed,
                uncommitted,
                reason: err.to_string(),
            });
        }

        tracing::info!("Upserted {} chunks", committed);
        Ok(committed)
    }

    /// Replaces the whole index with `chunks`. The new generation is built
    /// aside and swapped in only if every batch embeds successfully.
    pub async fn rebuild(&self, chunks: &[Chunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let _writer = self.writer.lock().await;
        let mut generation = IndexGeneration::empty(self.current().await.number + 1);
        let batches: Vec<&[Chunk]> = chunks.chunks(self.config.embed_batch_size.max(1)).collect();
        let mut results = std::pin::pin!(self.embed_batches(&batches));

        let mut next_batch = 0usize;
        while let Some(result) = results.next().await {
            generation.insert_batch(batches[next_batch], result?)?;
            next_batch += 1;
        }
        drop(results);

        let count = generation.records.len();
        self.publish(generation).await;
        tracing::info!("Rebuilt index with {} chunks", count);
        Ok(count)
    }

    /// Returns at most `k` chunks ordered by descending similarity, ties
    /// broken by position then chunk id. Ranks start at 1.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<EvidenceItem>, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("search query is empty".into()));
        }

        let generation = self.current().await;
        if k == 0 || generation.records.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embed_query(query).await?;
        if let Some(expected) = generation.dimension {
            if expected != query_vector.len() {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: query_vector.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &EmbeddingRecord)> = generation
            .records
            .values()
            .filter(|record| filter.matches(&record.chunk))
            .map(|record| (relevance(&query_vector, &record.vector), record))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.chunk.position.cmp(&b.1.chunk.position))
                .then_with(|| a.1.chunk.id.cmp(&b.1.chunk.id))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, record))| EvidenceItem {
                chunk: record.chunk.clone(),
                similarity_score: score,
                rank: i + 1,
            })
            .collect())
    }

    pub async fn count(&self) -> usize {
        self.current().await.records.len()
    }

    pub async fn get(&self, chunk_id: &str) -> Option<EmbeddingRecord> {
        self.current().await.records.get(chunk_id).cloned()
    }

    pub async fn stats(&self) -> IndexStats {
        self.current().await.stats()
    }

    /// Removes every record. Returns how many were dropped.
    pub async fn clear(&self) -> usize {
        let _writer = self.writer.lock().await;
        let current = self.current().await;
        let removed = current.records.len();
        self.publish(IndexGeneration::empty(current.number + 1)).await;
        removed
    }

    pub async fn delete(&self, chunk_ids: &[String]) -> usize {
        let _writer = self.writer.lock().await;
        let mut generation = self.current().await.successor();
        let removed = chunk_ids
            .iter()
            .filter(|id| generation.records.remove(id.as_str()).is_some())
            .count();
        if removed == 0 {
            return 0;
        }

        if generation.records.is_empty() {
            generation.dimension = None;
        }
        generation.updated_at = Some(Utc::now());
        self.publish(generation).await;
        removed
    }
}

async fn embed_texts(
    embedder: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, RagError> {
    let texts = &texts;
    let embedder = &embedder;
    retry
        .run("embed batch", move || embedder.embed_many(texts))
        .await
}

/// Cosine similarity clamped into [0, 1]; zero-norm vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

fn relevance(query: &[f32], vector: &[f32]) -> f32 {
    let score = cosine_similarity(query, vector);
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
