//! Caller-facing facade over processing, indexing and answering.

use std::sync::Arc;

use serde::Serialize;

use super::composer::{Answer, AnswerComposer};
use super::engine::{Document, DocumentProcessor};
use super::index::VectorIndex;
use super::retriever::Retriever;
use super::store::{IndexStats, SearchFilter, SnapshotStore};
use crate::core::config::defaults::{
    default_suggested_questions, page_type_questions, MAX_SUGGESTED_QUESTIONS,
};
use crate::core::config::RagSettings;
use crate::core::errors::RagError;
use crate::history::{ConversationStore, Turn};
use crate::llm::{EmbeddingProvider, GenerationProvider};

#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub chunks_indexed: usize,
    pub warnings: Vec<String>,
    pub stats: IndexStats,
}

pub struct RagService {
    index: Arc<VectorIndex>,
    processor: DocumentProcessor,
    composer: AnswerComposer,
    conversations: Arc<ConversationStore>,
}

impl RagService {
    /// Wires every component from `settings`. With a snapshot store the
    /// index persists each generation there.
    pub fn build(
        settings: &RagSettings,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
    ) -> Result<Self, RagError> {
        let processor = DocumentProcessor::new(settings.chunker.clone())?;

        let mut index = VectorIndex::new(embedder, settings.retry.clone(), settings.index.clone());
        if let Some(store) = snapshots {
            index = index.with_snapshot_store(store);
        }
        let index = Arc::new(index);

        let conversations = Arc::new(ConversationStore::new(settings.max_conversation_turns));
        let retriever = Retriever::new(index.clone(), settings.retriever.clone());
        let composer = AnswerComposer::new(
            retriever,
            generator,
            conversations.clone(),
            settings.retry.clone(),
            settings.composer.clone(),
        );

        Ok(Self {
            index,
            processor,
            composer,
            conversations,
        })
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub async fn answer(&self, question: &str, session_id: &str) -> Answer {
        self.composer.answer(question, session_id).await
    }

    pub async fn answer_filtered(&self, question: &str, session_id: &str, filter: &SearchFilter) -> Answer {
        self.composer.answer_filtered(question, session_id, filter).await
    }

    /// Processes `documents` and replaces the index with the result. On any
    /// failure the previous index stays in service.
    pub async fn rebuild_index(&self, documents: &[Document]) -> Result<RebuildReport, RagError> {
        let report = self.processor.process(documents);
        if report.chunks.is_empty() {
            tracing::warn!(
                "Refusing to rebuild from {} documents: no chunks produced",
                documents.len()
            );
            return Err(RagError::EmptyCorpus);
        }

        let chunks_indexed = self.index.rebuild(&report.chunks).await?;
        Ok(RebuildReport {
            documents_processed: report.documents_processed,
            documents_skipped: report.documents_skipped,
            chunks_indexed,
            warnings: report.warnings,
            stats: self.index.stats().await,
        })
    }

    /// Adds or refreshes documents without dropping the rest of the index.
    pub async fn upsert_documents(&self, documents: &[Document]) -> Result<usize, RagError> {
        let report = self.processor.process(documents);
        self.index.upsert(&report.chunks).await
    }

    pub async fn index_stats(&self) -> IndexStats {
        self.index.stats().await
    }

    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.conversations.history(session_id).await
    }

    pub async fn clear_session(&self, session_id: &str) -> bool {
        self.conversations.clear(session_id).await
    }

    /// Starter questions; page-type specific ones take the place of the last
    /// generic entries when the corpus has such pages.
    pub async fn suggested_questions(&self) -> Vec<String> {
        let stats = self.index.stats().await;
        let specific: Vec<String> = page_type_questions()
            .into_iter()
            .filter(|(page_type, _)| stats.page_types.get(*page_type).copied().unwrap_or(0) > 0)
            .map(|(_, question)| question.to_string())
            .collect();

        let mut questions = default_suggested_questions();
        questions.truncate(MAX_SUGGESTED_QUESTIONS.saturating_sub(specific.len()));
        questions.extend(specific);
        questions.truncate(MAX_SUGGESTED_QUESTIONS);
        questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::engine::ChunkerConfig;
    use crate::rag::test_support::{fast_retry, hashing, OutageEmbedder, ScriptedGenerator};

    fn settings() -> RagSettings {
        let mut settings = RagSettings::default();
        settings.chunker = ChunkerConfig {
            max_chunk_size: 300,
            min_chunk_size: 100,
            chunk_overlap: 30,
            ..ChunkerConfig::default()
        };
        settings.retry = fast_retry();
        settings.retriever.min_score = 0.3;
        settings
    }

    fn service() -> RagService {
        RagService::build(
            &settings(),
            hashing(),
            Arc::new(ScriptedGenerator::replying("GAIL publishes quarterly results [1].")),
            None,
        )
        .unwrap()
    }

    fn news_doc() -> Document {
        Document::new(
            "https://gailonline.com/news/q3-results",
            "Q3 results",
            "GAIL announced quarterly results with record gas marketing volumes and higher petrochemical margins.",
        )
    }

    #[tokio::test]
    async fn rebuild_reports_processing_and_index_counts() {
        let service = service();
        let report = service
            .rebuild_index(&[
                news_doc(),
                Document::new("https://gailonline.com/broken", "Broken", ""),
            ])
            .await
            .unwrap();

        assert_eq!(report.documents_processed, 1);
        assert_eq!(report.documents_skipped, 1);
        assert_eq!(report.chunks_indexed, 1);
        assert_eq!(report.stats.total_chunks, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn empty_corpus_never_replaces_index() {
        let service = service();
        service.rebuild_index(&[news_doc()]).await.unwrap();

        let err = service
            .rebuild_index(&[Document::new("https://gailonline.com/x", "X", "   ")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyCorpus));
        assert_eq!(service.index_stats().await.total_chunks, 1);
    }

    #[tokio::test]
    async fn rebuild_during_embedding_outage_fails_and_keeps_index() {
        let embedder = Arc::new(OutageEmbedder::new());
        let service = RagService::build(
            &settings(),
            embedder.clone(),
            Arc::new(ScriptedGenerator::replying("unused")),
            None,
        )
        .unwrap();
        service.rebuild_index(&[news_doc()]).await.unwrap();
        let before = service.index_stats().await;

        embedder.go_down();
        let calls_before = embedder.calls();
        let err = service
            .rebuild_index(&[Document::new(
                "https://gailonline.com/careers/openings",
                "Openings",
                "Executive trainee openings are announced through GATE based recruitment each year.",
            )])
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Unavailable(_)));
        assert_eq!(embedder.calls() - calls_before, 2);
        let after = service.index_stats().await;
        assert_eq!(after.total_chunks, before.total_chunks);
        assert_eq!(after.generation, before.generation);
        assert_eq!(after.total_sources, 1);
    }

    #[tokio::test]
    async fn upsert_documents_extends_index() {
        let service = service();
        service.rebuild_index(&[news_doc()]).await.unwrap();
        let added = service
            .upsert_documents(&[Document::new(
                "https://gailonline.com/careers/openings",
                "Openings",
                "Executive trainee openings are announced through GATE based recruitment each year.",
            )])
            .await
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(service.index_stats().await.total_sources, 2);
    }

    #[tokio::test]
    async fn suggested_questions_follow_page_types() {
        let service = service();
        let generic = service.suggested_questions().await;
        assert_eq!(generic, default_suggested_questions());

        service.rebuild_index(&[news_doc()]).await.unwrap();
        let questions = service.suggested_questions().await;
        assert_eq!(questions.len(), MAX_SUGGESTED_QUESTIONS);
        assert_eq!(
            questions.last().map(String::as_str),
            Some("What are the latest news and updates from GAIL?")
        );
    }

    #[tokio::test]
    async fn history_and_clear_session() {
        let service = service();
        service.rebuild_index(&[news_doc()]).await.unwrap();

        let answer = service.answer("What were GAIL's quarterly results?", "s1").await;
        assert_eq!(answer.status, crate::rag::composer::AnswerStatus::Answered);
        assert_eq!(service.history("s1").await.len(), 2);

        assert!(service.clear_session("s1").await);
        assert!(service.history("s1").await.is_empty());
    }
}
