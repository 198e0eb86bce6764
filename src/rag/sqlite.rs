//! SQLite-backed snapshot persistence for the vector index.
//!
//! Each save replaces the stored generation inside one transaction, so a
//! crash mid-save leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::engine::Chunk;
use super::store::{EmbeddingRecord, IndexSnapshot, SnapshotStore};
use crate::core::config::AppPaths;
use crate::core::errors::RagError;

pub struct SqliteSnapshotStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteSnapshotStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, RagError> {
        Self::with_path(paths.index_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, RagError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(RagError::storage)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_records (
                chunk_id TEXT PRIMARY KEY,
                source_url TEXT NOT NULL,
                chunk TEXT NOT NULL,
                embedding BLOB NOT NULL,
                ingested_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_index_records_source ON index_records(source_url)")
            .execute(&self.pool)
            .await
            .map_err(RagError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn meta_value(&self, key: &str) -> Result<Option<String>, RagError> {
        sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(RagError::storage)
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<EmbeddingRecord, RagError> {
        let chunk_json: String = row.get("chunk");
        let chunk: Chunk = serde_json::from_str(&chunk_json)
            .map_err(|e| RagError::Storage(format!("corrupt chunk row: {}", e)))?;
        let blob: Vec<u8> = row.get("embedding");
        let ingested_at: String = row.get("ingested_at");
        let ingested_at = DateTime::parse_from_rfc3339(&ingested_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(EmbeddingRecord {
            chunk,
            vector: Self::deserialize_embedding(&blob),
            ingested_at,
        })
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn save(&self, snapshot: &IndexSnapshot) -> Result<(), RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;

        sqlx::query("DELETE FROM index_records")
            .execute(&mut *tx)
            .await
            .map_err(RagError::storage)?;

        for record in &snapshot.records {
            let chunk_json = serde_json::to_string(&record.chunk).map_err(RagError::internal)?;
            sqlx::query(
                "INSERT OR REPLACE INTO index_records (chunk_id, source_url, chunk, embedding, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&record.chunk.id)
            .bind(&record.chunk.source_url)
            .bind(&chunk_json)
            .bind(Self::serialize_embedding(&record.vector))
            .bind(record.ingested_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(RagError::storage)?;
        }

        let meta = [
            ("generation", Some(snapshot.generation.to_string())),
            ("dimension", snapshot.dimension.map(|d| d.to_string())),
            ("updated_at", snapshot.updated_at.map(|t| t.to_rfc3339())),
        ];
        for (key, value) in meta {
            match value {
                Some(value) => {
                    sqlx::query(
                        "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
                         VALUES (?1, ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                    )
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await
                    .map_err(RagError::storage)?;
                }
                None => {
                    sqlx::query("DELETE FROM index_meta WHERE key = ?1")
                        .bind(key)
                        .execute(&mut *tx)
                        .await
                        .map_err(RagError::storage)?;
                }
            }
        }

        tx.commit().await.map_err(RagError::storage)?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<IndexSnapshot>, RagError> {
        let Some(generation) = self.meta_value("generation").await? else {
            return Ok(None);
        };
        let generation = generation
            .parse::<u64>()
            .map_err(|e| RagError::Storage(format!("invalid stored generation: {}", e)))?;
        let dimension = self
            .meta_value("dimension")
            .await?
            .and_then(|v| v.parse::<usize>().ok());
        let updated_at = self
            .meta_value("updated_at")
            .await?
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let rows = sqlx::query("SELECT chunk, embedding, ingested_at FROM index_records")
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::storage)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::row_to_record(row) {
                Ok(record) if dimension.map_or(true, |d| d == record.vector.len()) => {
                    records.push(record)
                }
                Ok(record) => tracing::warn!(
                    "Dropping stored record {} with dimension {}",
                    record.chunk.id,
                    record.vector.len()
                ),
                Err(e) => tracing::warn!("Dropping unreadable stored record: {}", e),
            }
        }

        Ok(Some(IndexSnapshot {
            generation,
            dimension,
            updated_at,
            records,
        }))
    }
}
