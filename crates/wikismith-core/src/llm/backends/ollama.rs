//! Ollama (self-hosted) chat and embeddings

use super::{decode_json, parse_role, Backend, Endpoint};
use crate::error::{Result, WikismithError};
use crate::llm::chat::{ChatBackend, ChatParams};
use crate::llm::embedding::EmbeddingBackend;
use crate::llm::stream::{StreamFraming, StreamPayload};
use crate::llm::transport::HttpRequest;
use crate::llm::types::{
    ChatResult, Choice, Embedding, EmbeddingResult, Message, StreamChunk, Usage,
};
use crate::llm::usage::{estimate_tokens, lookup_by_prefix, ModelPricing};
use serde::Deserialize;
use serde_json::json;

const EMBEDDING_DIMENSIONS: &[(&str, usize)] = &[
    ("nomic-embed-text", 768),
    ("mxbai-embed-large", 1024),
    ("snowflake-arctic-embed", 1024),
    ("bge-m3", 1024),
    ("all-minilm", 384),
];
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

const EMBEDDING_MAX_TOKENS: &[(&str, usize)] = &[
    ("nomic-embed-text", 8192),
    ("bge-m3", 8192),
    ("mxbai-embed-large", 512),
    ("snowflake-arctic-embed", 512),
    ("all-minilm", 256),
];
const DEFAULT_EMBEDDING_MAX_TOKENS: usize = 512;

/// Ollama API binding; no credential, no metered cost
#[derive(Debug, Clone, Copy, Default)]
pub struct Ollama;

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl ChatResponse {
    fn usage(&self) -> Option<Usage> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(Usage::new(
                prompt.unwrap_or_default(),
                completion.unwrap_or_default(),
            )),
        }
    }
}

impl Backend for Ollama {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn default_base_url(&self) -> &'static str {
        "http://localhost:11434"
    }

    fn requires_api_key(&self) -> bool {
        false
    }
}

impl ChatBackend for Ollama {
    fn framing(&self) -> StreamFraming {
        StreamFraming::Ndjson
    }

    fn chat_request(
        &self,
        endpoint: &Endpoint,
        messages: &[Message],
        params: &ChatParams,
        stream: bool,
    ) -> Result<HttpRequest> {
        let body = json!({
            "model": params.model,
            "messages": messages,
            "stream": stream,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_tokens,
            },
        });

        Ok(HttpRequest::post_json(format!("{}/api/chat", endpoint.base_url), body)
            .bearer(endpoint.api_key()))
    }

    fn parse_chat_response(&self, body: &[u8]) -> Result<ChatResult> {
        let response: ChatResponse = decode_json(self.name(), body)?;
        let usage = response.usage().unwrap_or_default();
        let message = response
            .message
            .map(|m| Message::new(parse_role(&m.role), m.content))
            .unwrap_or_else(|| Message::assistant(""));

        Ok(ChatResult {
            id: format!("ollama-{}", response.created_at),
            model: response.model,
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: response.done_reason,
            }],
            usage,
        })
    }

    fn parse_stream_payload(&self, payload: &str) -> Result<StreamPayload> {
        let response: ChatResponse = decode_json(self.name(), payload.as_bytes())?;
        let usage = response.usage();

        Ok(StreamPayload::Chunk(StreamChunk {
            delta: response
                .message
                .map(|m| m.content)
                .unwrap_or_default(),
            finish_reason: response.done_reason,
            usage,
            done: response.done,
        }))
    }

    fn chat_pricing(&self, _model: &str) -> ModelPricing {
        ModelPricing::FREE
    }
}

impl EmbeddingBackend for Ollama {
    /// `/api/embeddings` takes one prompt per request
    fn max_batch_size(&self) -> usize {
        1
    }

    fn default_dimensions(&self, model: &str) -> usize {
        lookup_by_prefix(EMBEDDING_DIMENSIONS, model, DEFAULT_EMBEDDING_DIMENSIONS)
    }

    fn default_max_input_tokens(&self, model: &str) -> usize {
        lookup_by_prefix(EMBEDDING_MAX_TOKENS, model, DEFAULT_EMBEDDING_MAX_TOKENS)
    }

    fn embedding_request(
        &self,
        endpoint: &Endpoint,
        model: &str,
        texts: &[String],
        _dimensions: Option<usize>,
    ) -> Result<HttpRequest> {
        let [text] = texts else {
            return Err(WikismithError::InvalidInput(format!(
                "ollama embeds one text per request, got {}",
                texts.len()
            )));
        };

        let body = json!({ "model": model, "prompt": text });
        Ok(
            HttpRequest::post_json(format!("{}/api/embeddings", endpoint.base_url), body)
                .bearer(endpoint.api_key()),
        )
    }

    fn parse_embedding_response(&self, body: &[u8], texts: &[String]) -> Result<EmbeddingResult> {
        let response: EmbedResponse = decode_json(self.name(), body)?;
        let tokens: u64 = texts.iter().map(|t| estimate_tokens(t) as u64).sum();

        Ok(EmbeddingResult {
            embeddings: vec![Embedding {
                index: 0,
                vector: response.embedding,
            }],
            model: String::new(),
            usage: Usage::prompt_only(tokens),
        })
    }

    fn embedding_price_per_million(&self, _model: &str) -> f64 {
        0.0
    }
}
