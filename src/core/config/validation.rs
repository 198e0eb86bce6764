use serde_json::{Map, Value};

use crate::core::errors::RagError;

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(chunker) = expect_optional_object(root, "chunker")? {
        validate_u64_field(chunker, "chunker.max_chunk_size", "max_chunk_size", 1, 100_000)?;
        validate_u64_field(chunker, "chunker.min_chunk_size", "min_chunk_size", 1, 100_000)?;
        validate_u64_field(chunker, "chunker.chunk_overlap", "chunk_overlap", 0, 100_000)?;
        validate_u64_field(chunker, "chunker.min_chunk_words", "min_chunk_words", 0, 10_000)?;
        validate_u64_field(
            chunker,
            "chunker.min_document_words",
            "min_document_words",
            0,
            100_000,
        )?;
        validate_f64_field(chunker, "chunker.min_alpha_ratio", "min_alpha_ratio", 0.0, 1.0)?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_u64_field(index, "index.embed_batch_size", "embed_batch_size", 1, 4096)?;
        validate_u64_field(index, "index.embed_concurrency", "embed_concurrency", 1, 64)?;
        validate_bool_field(index, "index.persist", "persist")?;
    }

    if let Some(retriever) = expect_optional_object(root, "retriever")? {
        validate_u64_field(retriever, "retriever.top_k", "top_k", 1, 100)?;
        validate_f64_field(retriever, "retriever.min_score", "min_score", 0.0, 1.0)?;
        validate_u64_field(retriever, "retriever.context_turns", "context_turns", 0, 20)?;
        validate_u64_field(
            retriever,
            "retriever.candidate_multiplier",
            "candidate_multiplier",
            1,
            20,
        )?;
        validate_optional_string_field(retriever, "retriever.query_prefix", "query_prefix")?;
        validate_string_array_field(retriever, "retriever.domain_keywords", "domain_keywords")?;
    }

    if let Some(composer) = expect_optional_object(root, "composer")? {
        validate_u64_field(composer, "composer.max_tokens", "max_tokens", 1, 32_768)?;
        validate_f64_field(composer, "composer.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(
            composer,
            "composer.max_context_chars",
            "max_context_chars",
            100,
            1_000_000,
        )?;
        validate_u64_field(composer, "composer.history_turns", "history_turns", 0, 100)?;
        validate_optional_string_field(composer, "composer.system_prompt", "system_prompt")?;
    }

    if let Some(conversation) = expect_optional_object(root, "conversation")? {
        validate_u64_field(conversation, "conversation.max_turns", "max_turns", 2, 10_000)?;
    }

    if let Some(retry) = expect_optional_object(root, "retry")? {
        validate_u64_field(retry, "retry.max_attempts", "max_attempts", 1, 10)?;
        validate_u64_field(retry, "retry.initial_backoff_ms", "initial_backoff_ms", 0, 60_000)?;
        validate_u64_field(retry, "retry.max_backoff_ms", "max_backoff_ms", 0, 300_000)?;
        validate_u64_field(retry, "retry.timeout_ms", "timeout_ms", 1, 600_000)?;
    }

    if let Some(provider) = expect_optional_object(root, "provider")? {
        validate_optional_string_field(provider, "provider.embedding_backend", "embedding_backend")?;
        validate_optional_string_field(provider, "provider.base_url", "base_url")?;
        validate_optional_string_field(provider, "provider.api_key", "api_key")?;
        validate_optional_string_field(provider, "provider.chat_model", "chat_model")?;
        validate_optional_string_field(provider, "provider.embedding_model", "embedding_model")?;
        validate_u64_field(
            provider,
            "provider.embedding_dimension",
            "embedding_dimension",
            8,
            65_536,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(RagError::Config(format!(
            "invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(RagError::Config(format!(
                "invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Config(format!(
        "invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_well_formed_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "chunker": { "max_chunk_size": 800, "min_chunk_size": 200, "chunk_overlap": 100 },
            "retriever": { "top_k": 5, "min_score": 0.35, "domain_keywords": ["GAIL"] },
            "composer": { "temperature": 0.3, "system_prompt": null },
            "provider": { "embedding_backend": "hashing", "embedding_dimension": 256 }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_mistyped_values() {
        let err = validate_config(&json!({ "retriever": { "min_score": 1.5 } })).unwrap_err();
        assert!(err.to_string().contains("retriever.min_score"));

        let err = validate_config(&json!({ "chunker": { "max_chunk_size": "big" } })).unwrap_err();
        assert!(err.to_string().contains("expected integer"));

        let err = validate_config(&json!({ "index": [] })).unwrap_err();
        assert!(err.to_string().contains("expected object"));

        let err =
            validate_config(&json!({ "retriever": { "domain_keywords": ["", "gas"] } })).unwrap_err();
        assert!(err.to_string().contains("domain_keywords[0]"));
    }
}
