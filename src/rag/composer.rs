use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::confidence;
use super::context_builder::build_prompt;
use super::retriever::Retriever;
use super::store::{EvidenceItem, SearchFilter};
use crate::core::config::defaults::{DEFAULT_SYSTEM_PROMPT, GENERATION_FAILED_ANSWER, NO_CONTEXT_ANSWER};
use crate::core::config::settings::{section_f64, section_str, section_u64};
use crate::history::{ConversationStore, Turn};
use crate::llm::{CompletionRequest, GenerationProvider, RetryPolicy, TokenUsage};

#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    /// evidence budget inside the prompt
    pub max_context_chars: usize,
    /// conversation turns quoted in the prompt
    pub history_turns: usize,
    pub system_prompt: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.3,
            max_context_chars: 6000,
            history_turns: 4,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ComposerConfig {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        Self {
            max_tokens: section_u64(config, "composer", "max_tokens")
                .map(|v| v.min(u32::MAX as u64) as u32)
                .unwrap_or(defaults.max_tokens),
            temperature: section_f64(config, "composer", "temperature")
                .map(|v| v as f32)
                .unwrap_or(defaults.temperature),
            max_context_chars: section_u64(config, "composer", "max_context_chars")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_context_chars),
            history_turns: section_u64(config, "composer", "history_turns")
                .map(|v| v as usize)
                .unwrap_or(defaults.history_turns),
            system_prompt: section_str(config, "composer", "system_prompt")
                .unwrap_or(defaults.system_prompt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Answered,
    NoContext,
    GenerationFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCitation {
    pub url: String,
    pub title: String,
    pub similarity_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceCitation>,
    pub confidence: f32,
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Answer {
    pub fn no_context() -> Self {
        Self::fallback(NO_CONTEXT_ANSWER, AnswerStatus::NoContext)
    }

    pub fn generation_failed() -> Self {
        Self::fallback(GENERATION_FAILED_ANSWER, AnswerStatus::GenerationFailed)
    }

    fn fallback(text: &str, status: AnswerStatus) -> Self {
        Self {
            text: text.to_string(),
            sources: Vec::new(),
            confidence: 0.0,
            status,
            usage: None,
        }
    }
}

/// One citation per source url, highest score first.
pub fn citations(evidence: &[EvidenceItem]) -> Vec<SourceCitation> {
    let mut ordered: Vec<&EvidenceItem> = evidence.iter().collect();
    ordered.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|item| seen.insert(item.chunk.source_url.as_str()))
        .map(|item| SourceCitation {
            url: item.chunk.source_url.clone(),
            title: item.chunk.source_title.clone(),
            similarity_score: item.similarity_score,
        })
        .collect()
}

/// Answers questions against the index and keeps per-session history.
pub struct AnswerComposer {
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    conversations: Arc<ConversationStore>,
    retry: RetryPolicy,
    config: ComposerConfig,
}

impl AnswerComposer {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn GenerationProvider>,
        conversations: Arc<ConversationStore>,
        retry: RetryPolicy,
        config: ComposerConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            conversations,
            retry,
            config,
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub async fn answer(&self, question: &str, session_id: &str) -> Answer {
        self.answer_filtered(question, session_id, &SearchFilter::any())
            .await
    }

    /// Never fails: retrieval errors degrade to the no-context answer and
    /// generation errors to the apology answer. Turns are recorded only for
    /// generated answers. The session stays locked for the whole request.
    pub async fn answer_filtered(&self, question: &str, session_id: &str, filter: &SearchFilter) -> Answer {
        let handle = self.conversations.session(session_id).await;
        let mut session = handle.lock().await;
        let history = session.turns();

        let evidence = match self.retriever.retrieve(question, &history, filter).await {
            Ok(evidence) => evidence,
            Err(e) => {
                tracing::warn!("Retrieval failed for session {}: {}", session_id, e);
                Vec::new()
            }
        };

        if evidence.is_empty() {
            tracing::info!("No relevant context for question in session {}", session_id);
            return Answer::no_context();
        }

        let prompt_history = session.recent(self.config.history_turns);
        let prompt = build_prompt(
            &self.config.system_prompt,
            &evidence,
            &prompt_history,
            question,
            self.config.max_context_chars,
        );
        // Only evidence the model actually saw is cited and scored.
        let evidence = &evidence[..prompt.evidence_used];
        let request = CompletionRequest::new(prompt.text)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let generator = &self.generator;
        let request = &request;
        let completion = match self
            .retry
            .run("generate answer", move || generator.complete(request.clone()))
            .await
        {
            Ok(completion) if !completion.text.trim().is_empty() => completion,
            Ok(_) => {
                tracing::warn!("Generation returned an empty answer for session {}", session_id);
                return Answer::generation_failed();
            }
            Err(e) => {
                tracing::warn!("Generation failed for session {}: {}", session_id, e);
                return Answer::generation_failed();
            }
        };

        let text = completion.text.trim().to_string();
        let confidence = confidence::score(&text, evidence);
        let sources = citations(evidence);

        session.append(Turn::user(question.trim()));
        session.append(Turn::assistant(text.clone()));

        tracing::info!(
            "Answered with {} sources, confidence {:.2}",
            sources.len(),
            confidence
        );
        Answer {
            text,
            sources,
            confidence,
            status: AnswerStatus::Answered,
            usage: completion.usage,
        }
    }
}
