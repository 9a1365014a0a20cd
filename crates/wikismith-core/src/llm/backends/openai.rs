//! OpenAI Chat Completions and Embeddings API

use super::{decode_json, parse_role, Backend, Endpoint};
use crate::error::Result;
use crate::llm::chat::{ChatBackend, ChatParams};
use crate::llm::embedding::EmbeddingBackend;
use crate::llm::stream::StreamPayload;
use crate::llm::transport::HttpRequest;
use crate::llm::types::{
    ChatResult, Choice, Embedding, EmbeddingResult, Message, StreamChunk, Usage,
};
use crate::llm::usage::{estimate_tokens, lookup_by_prefix, ModelPricing};
use serde::Deserialize;
use serde_json::json;

const STREAM_DONE: &str = "[DONE]";

/// Per-million pricing; more specific prefixes first
const CHAT_PRICING: &[(&str, ModelPricing)] = &[
    ("gpt-4o-mini", ModelPricing::new(0.15, 0.60)),
    ("gpt-4o", ModelPricing::new(2.50, 10.00)),
    ("gpt-4.1-nano", ModelPricing::new(0.10, 0.40)),
    ("gpt-4.1-mini", ModelPricing::new(0.40, 1.60)),
    ("gpt-4.1", ModelPricing::new(2.00, 8.00)),
    ("gpt-4-turbo", ModelPricing::new(10.00, 30.00)),
    ("gpt-4", ModelPricing::new(30.00, 60.00)),
    ("gpt-3.5-turbo", ModelPricing::new(0.50, 1.50)),
    ("o1-mini", ModelPricing::new(3.00, 12.00)),
    ("o1", ModelPricing::new(15.00, 60.00)),
];
const DEFAULT_CHAT_PRICING: ModelPricing = ModelPricing::new(2.50, 10.00);

const EMBEDDING_PRICING: &[(&str, f64)] = &[
    ("text-embedding-3-small", 0.02),
    ("text-embedding-3-large", 0.13),
    ("text-embedding-ada-002", 0.10),
];
const DEFAULT_EMBEDDING_PRICE: f64 = 0.10;

const EMBEDDING_DIMENSIONS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
const EMBEDDING_MAX_TOKENS: usize = 8191;
const EMBEDDING_BATCH_SIZE: usize = 2048;

/// OpenAI (and OpenAI-compatible) API binding
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAi;

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    index: usize,
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<EmbedUsage>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedUsage {
    #[serde(default)]
    prompt_tokens: u64,
}

impl Backend for OpenAi {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.openai.com/v1"
    }
}

impl ChatBackend for OpenAi {
    fn chat_request(
        &self,
        endpoint: &Endpoint,
        messages: &[Message],
        params: &ChatParams,
        stream: bool,
    ) -> Result<HttpRequest> {
        let mut body = json!({
            "model": params.model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": stream,
        });
        if stream {
            body["stream_options"] = json!({ "include_usage": true });
        }

        Ok(
            HttpRequest::post_json(format!("{}/chat/completions", endpoint.base_url), body)
                .bearer(endpoint.api_key()),
        )
    }

    fn parse_chat_response(&self, body: &[u8]) -> Result<ChatResult> {
        let response: ChatResponse = decode_json(self.name(), body)?;
        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(ChatResult {
            id: response.id,
            model: response.model,
            choices: response
                .choices
                .into_iter()
                .map(|c| Choice {
                    index: c.index,
                    message: Message::new(
                        parse_role(&c.message.role),
                        c.message.content.unwrap_or_default(),
                    ),
                    finish_reason: c.finish_reason,
                })
                .collect(),
            usage,
        })
    }

    fn parse_stream_payload(&self, payload: &str) -> Result<StreamPayload> {
        if payload == STREAM_DONE {
            return Ok(StreamPayload::Done);
        }

        let response: StreamResponse = decode_json(self.name(), payload.as_bytes())?;
        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));
        let choice = response.choices.into_iter().next();

        if choice.is_none() && usage.is_none() {
            return Ok(StreamPayload::Skip);
        }

        let (delta, finish_reason) = match choice {
            Some(c) => (c.delta.content.unwrap_or_default(), c.finish_reason),
            None => (String::new(), None),
        };

        Ok(StreamPayload::Chunk(StreamChunk {
            delta,
            finish_reason,
            usage,
            done: false,
        }))
    }

    fn chat_pricing(&self, model: &str) -> ModelPricing {
        lookup_by_prefix(CHAT_PRICING, model, DEFAULT_CHAT_PRICING)
    }
}

impl EmbeddingBackend for OpenAi {
    fn max_batch_size(&self) -> usize {
        EMBEDDING_BATCH_SIZE
    }

    fn default_dimensions(&self, model: &str) -> usize {
        lookup_by_prefix(EMBEDDING_DIMENSIONS, model, DEFAULT_EMBEDDING_DIMENSIONS)
    }

    fn default_max_input_tokens(&self, _model: &str) -> usize {
        EMBEDDING_MAX_TOKENS
    }

    fn embedding_request(
        &self,
        endpoint: &Endpoint,
        model: &str,
        texts: &[String],
        dimensions: Option<usize>,
    ) -> Result<HttpRequest> {
        let mut body = json!({
            "model": model,
            "input": texts,
            "encoding_format": "float",
        });
        if let Some(dimensions) = dimensions {
            body["dimensions"] = json!(dimensions);
        }

        Ok(
            HttpRequest::post_json(format!("{}/embeddings", endpoint.base_url), body)
                .bearer(endpoint.api_key()),
        )
    }

    fn parse_embedding_response(&self, body: &[u8], texts: &[String]) -> Result<EmbeddingResult> {
        let response: EmbedResponse = decode_json(self.name(), body)?;
        let usage = match response.usage {
            Some(u) => Usage::prompt_only(u.prompt_tokens),
            None => Usage::prompt_only(texts.iter().map(|t| estimate_tokens(t) as u64).sum()),
        };

        Ok(EmbeddingResult {
            embeddings: response
                .data
                .into_iter()
                .map(|d| Embedding {
                    index: d.index,
                    vector: d.embedding,
                })
                .collect(),
            model: response.model,
            usage,
        })
    }

    fn embedding_price_per_million(&self, model: &str) -> f64 {
        lookup_by_prefix(EMBEDDING_PRICING, model, DEFAULT_EMBEDDING_PRICE)
    }
}
