use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::index::VectorIndex;
use super::store::{EvidenceItem, SearchFilter};
use crate::core::config::settings::{section_f64, section_str, section_str_list, section_u64};
use crate::core::errors::RagError;
use crate::history::{Role, Turn};

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub top_k: usize,
    /// evidence scoring below this is discarded
    pub min_score: f32,
    /// prior user turns folded into the embedded query
    pub context_turns: usize,
    /// candidates requested from the index per returned item
    pub candidate_multiplier: usize,
    /// prepended to the embedded query when the question names no domain keyword
    pub query_prefix: Option<String>,
    pub domain_keywords: Vec<String>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.35,
            context_turns: 2,
            candidate_multiplier: 3,
            query_prefix: None,
            domain_keywords: Vec::new(),
        }
    }
}

impl RetrieverConfig {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        Self {
            top_k: section_u64(config, "retriever", "top_k")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.top_k),
            min_score: section_f64(config, "retriever", "min_score")
                .map(|v| v.clamp(0.0, 1.0) as f32)
                .unwrap_or(defaults.min_score),
            context_turns: section_u64(config, "retriever", "context_turns")
                .map(|v| v as usize)
                .unwrap_or(defaults.context_turns),
            candidate_multiplier: section_u64(config, "retriever", "candidate_multiplier")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.candidate_multiplier),
            query_prefix: section_str(config, "retriever", "query_prefix"),
            domain_keywords: section_str_list(config, "retriever", "domain_keywords")
                .unwrap_or(defaults.domain_keywords),
        }
    }
}

/// Selects evidence for a question from the shared index.
pub struct Retriever {
    index: Arc<VectorIndex>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, config: RetrieverConfig) -> Self {
        Self { index, config }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Builds the text that gets embedded: recent user turns, then the
    /// question, optionally prefixed with the domain hint.
    pub fn contextualize_query(&self, question: &str, history: &[Turn]) -> String {
        let mut prior: Vec<&str> = history
            .iter()
            .rev()
            .filter(|turn| turn.role == Role::User)
            .take(self.config.context_turns)
            .map(|turn| turn.text.trim())
            .filter(|text| !text.is_empty())
            .collect();
        prior.reverse();
        prior.push(question.trim());
        let query = prior.join(" ");

        match &self.config.query_prefix {
            Some(prefix) if !self.mentions_domain(question) => format!("{} {}", prefix, query),
            _ => query,
        }
    }

    fn mentions_domain(&self, question: &str) -> bool {
        let lower = question.to_lowercase();
        self.config
            .domain_keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_lowercase()))
    }

    /// Ranked evidence, at most one item per source page. Empty evidence is a
    /// valid outcome; index failures propagate.
    pub async fn retrieve(
        &self,
        question: &str,
        history: &[Turn],
        filter: &SearchFilter,
    ) -> Result<Vec<EvidenceItem>, RagError> {
        if question.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query = self.contextualize_query(question, history);
        let candidates = self
            .index
            .search(
                &query,
                self.config.top_k * self.config.candidate_multiplier,
                filter,
            )
            .await?;
        let candidate_count = candidates.len();

        let evidence = select_evidence(candidates, self.config.min_score, self.config.top_k);
        tracing::debug!(
            "Retrieved {} evidence items from {} candidates for question: {}",
            evidence.len(),
            candidate_count,
            question
        );
        Ok(evidence)
    }
}

/// Drops weak candidates, keeps the best item per source url and re-ranks.
/// Expects `candidates` sorted by descending score.
fn select_evidence(candidates: Vec<EvidenceItem>, min_score: f32, top_k: usize) -> Vec<EvidenceItem> {
    let mut seen_sources = HashSet::new();
    let mut evidence: Vec<EvidenceItem> = candidates
        .into_iter()
        .filter(|item| item.similarity_score >= min_score)
        .filter(|item| seen_sources.insert(item.chunk.source_url.clone()))
        .collect();

    evidence.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    evidence.truncate(top_k);
    for (i, item) in evidence.iter_mut().enumerate() {
        item.rank = i + 1;
    }
    evidence
}
