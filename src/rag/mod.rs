//! Retrieval-augmented answering over the GAIL website corpus.
//!
//! - `engine`: cleans scraped pages and splits them into chunks
//! - `index`: embeds chunks and serves similarity search
//! - `retriever`, `context_builder`, `composer`: turn a question into a grounded answer
//! - `service`: the facade callers use

pub mod composer;
pub mod confidence;
pub mod context_builder;
pub mod engine;
pub mod index;
pub mod retriever;
pub mod service;
pub mod sqlite;
pub mod store;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use composer::{Answer, AnswerComposer, AnswerStatus, ComposerConfig, SourceCitation};
pub use engine::{
    load_documents, Chunk, ChunkerConfig, Document, DocumentProcessor, PageType, ProcessReport,
};
pub use index::{IndexConfig, VectorIndex};
pub use retriever::{Retriever, RetrieverConfig};
pub use service::{RagService, RebuildReport};
pub use sqlite::SqliteSnapshotStore;
pub use store::{EvidenceItem, IndexStats, SearchFilter, SnapshotStore};
