use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, GenerationProvider, ProviderSettings};
use super::types::{ChatMessage, Completion, CompletionRequest, TokenUsage};
use crate::core::errors::RagError;

/// Client for any server speaking the OpenAI `/v1/chat/completions` and
/// `/v1/embeddings` dialect (OpenAI, LM Studio, vLLM, llama.cpp server).
///
/// Each call is a single attempt; retries are the caller's `RetryPolicy`.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(settings: &ProviderSettings, request_timeout: Duration) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            chat_model: settings.chat_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        rejected: fn(String) -> RagError,
    ) -> Result<reqwest::Response, RagError> {
        let res = self
            .authorized(self.client.post(self.endpoint(path)))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let text = res.text().await.unwrap_or_default();
        Err(classify_status(status, text, rejected))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed_many(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
        };
        let res = self
            .post_json("embeddings", &request, RagError::Embedding)
            .await?;

        let payload: EmbeddingResponse = res
            .json()
            .await
            .map_err(|e| RagError::MalformedResponse(format!("embedding payload: {}", e)))?;

        order_embeddings(payload, inputs.len())
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, RagError> {
        let body = json!({
            "model": self.chat_model,
            "messages": [ChatMessage::user(request.prompt)],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": false,
        });

        let res = self
            .post_json("chat/completions", &body, RagError::Generation)
            .await?;

        let payload: Value = res
            .json()
            .await
            .map_err(|e| RagError::MalformedResponse(format!("chat payload: {}", e)))?;

        parse_completion(&payload)
    }
}

fn endpoint_url(base_url: &str, path: &str) -> String {
    if base_url.ends_with("/v1") {
        format!("{}/{}", base_url, path)
    } else {
        format!("{}/v1/{}", base_url, path)
    }
}

fn transport_error(err: reqwest::Error) -> RagError {
    if err.is_timeout() {
        RagError::Unavailable(format!("request timed out: {}", err))
    } else if err.is_connect() || err.is_request() || err.is_body() {
        RagError::Unavailable(err.to_string())
    } else {
        RagError::internal(err)
    }
}

fn classify_status(status: StatusCode, body: String, rejected: fn(String) -> RagError) -> RagError {
    let detail = format!("{}: {}", status, body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS {
        RagError::RateLimited(detail)
    } else if status.is_server_error() {
        RagError::Unavailable(detail)
    } else {
        rejected(detail)
    }
}

fn order_embeddings(
    mut payload: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    payload.data.sort_by_key(|entry| entry.index);
    if payload.data.len() != expected {
        return Err(RagError::MalformedResponse(format!(
            "received {} embeddings for {} inputs",
            payload.data.len(),
            expected
        )));
    }
    if let Some((position, entry)) = payload
        .data
        .iter()
        .enumerate()
        .find(|(position, entry)| entry.index != *position)
    {
        return Err(RagError::MalformedResponse(format!(
            "embedding index {} found at position {}",
            entry.index, position
        )));
    }
    Ok(payload.data.into_iter().map(|entry| entry.embedding).collect())
}

fn parse_completion(payload: &Value) -> Result<Completion, RagError> {
    let text = payload["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| RagError::MalformedResponse("missing choices[0].message.content".into()))?
        .trim()
        .to_string();

    let usage = payload
        .get("usage")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value::<TokenUsage>(v.clone()).ok());

    Ok(Completion { text, usage })
}
