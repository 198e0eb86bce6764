//! Typed settings extracted from the merged YAML config.
//!
//! Every component reads its own section with defaults, so a missing or
//! partial config file always yields a usable pipeline.

use serde_json::Value;

use crate::core::errors::RagError;
use crate::history::DEFAULT_MAX_TURNS;
use crate::llm::{ProviderSettings, RetryPolicy};
use crate::rag::composer::ComposerConfig;
use crate::rag::engine::ChunkerConfig;
use crate::rag::index::IndexConfig;
use crate::rag::retriever::RetrieverConfig;

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub chunker: ChunkerConfig,
    pub index: IndexConfig,
    pub retriever: RetrieverConfig,
    pub composer: ComposerConfig,
    pub retry: RetryPolicy,
    pub provider: ProviderSettings,
    pub max_conversation_turns: usize,
}

impl RagSettings {
    pub fn from_config(config: &Value) -> Result<Self, RagError> {
        let chunker = ChunkerConfig::from_config(config);
        chunker.validate()?;

        let retry = RetryPolicy::from_config(config);
        if retry.max_backoff < retry.initial_backoff {
            return Err(RagError::Config(
                "retry.max_backoff_ms must not be below retry.initial_backoff_ms".to_string(),
            ));
        }

        let max_conversation_turns = section_u64(config, "conversation", "max_turns")
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_TURNS);

        Ok(Self {
            chunker,
            index: IndexConfig::from_config(config),
            retriever: RetrieverConfig::from_config(config),
            composer: ComposerConfig::from_config(config),
            retry,
            provider: ProviderSettings::from_config(config),
            max_conversation_turns,
        })
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            index: IndexConfig::default(),
            retriever: RetrieverConfig::default(),
            composer: ComposerConfig::default(),
            retry: RetryPolicy::default(),
            provider: ProviderSettings::default(),
            max_conversation_turns: DEFAULT_MAX_TURNS,
        }
    }
}

pub(crate) fn section_value<'a>(config: &'a Value, section: &str, key: &str) -> Option<&'a Value> {
    config.get(section).and_then(|v| v.get(key))
}

pub(crate) fn section_u64(config: &Value, section: &str, key: &str) -> Option<u64> {
    section_value(config, section, key).and_then(|v| v.as_u64())
}

pub(crate) fn section_f64(config: &Value, section: &str, key: &str) -> Option<f64> {
    section_value(config, section, key).and_then(|v| v.as_f64())
}

pub(crate) fn section_bool(config: &Value, section: &str, key: &str) -> Option<bool> {
    section_value(config, section, key).and_then(|v| v.as_bool())
}

pub(crate) fn section_str(config: &Value, section: &str, key: &str) -> Option<String> {
    section_value(config, section, key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn section_str_list(config: &Value, section: &str, key: &str) -> Option<Vec<String>> {
    section_value(config, section, key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.to_string())
                .collect()
        })
}
