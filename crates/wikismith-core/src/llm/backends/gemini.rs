//! Google Gemini (Generative Language API)

use super::{decode_json, Backend, Endpoint};
use crate::error::Result;
use crate::llm::chat::{ChatBackend, ChatParams};
use crate::llm::embedding::EmbeddingBackend;
use crate::llm::stream::StreamPayload;
use crate::llm::transport::HttpRequest;
use crate::llm::types::{
    ChatResult, Choice, Embedding, EmbeddingResult, Message, Role, StreamChunk, Usage,
};
use crate::llm::usage::{estimate_tokens, lookup_by_prefix, ModelPricing};
use serde::Deserialize;
use serde_json::{json, Value};

const API_KEY_HEADER: &str = "x-goog-api-key";

const CHAT_PRICING: &[(&str, ModelPricing)] = &[
    ("gemini-2.5-flash-lite", ModelPricing::new(0.10, 0.40)),
    ("gemini-2.5-flash", ModelPricing::new(0.30, 2.50)),
    ("gemini-2.5-pro", ModelPricing::new(1.25, 10.00)),
    ("gemini-2.0-flash-lite", ModelPricing::new(0.075, 0.30)),
    ("gemini-2.0-flash", ModelPricing::new(0.10, 0.40)),
    ("gemini-1.5-flash", ModelPricing::new(0.075, 0.30)),
    ("gemini-1.5-pro", ModelPricing::new(1.25, 5.00)),
];
const DEFAULT_CHAT_PRICING: ModelPricing = ModelPricing::new(1.25, 5.00);

const EMBEDDING_PRICING: &[(&str, f64)] = &[
    ("gemini-embedding-001", 0.15),
    ("text-embedding-004", 0.0),
];
const DEFAULT_EMBEDDING_PRICE: f64 = 0.0;

const EMBEDDING_DIMENSIONS: &[(&str, usize)] = &[
    ("gemini-embedding-001", 3072),
    ("text-embedding-004", 768),
    ("embedding-001", 768),
];
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;
const EMBEDDING_MAX_TOKENS: usize = 2048;
const EMBEDDING_BATCH_SIZE: usize = 100;

/// Gemini API binding
#[derive(Debug, Clone, Copy, Default)]
pub struct Gemini;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: String,
    #[serde(default)]
    response_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

fn model_path(model: &str) -> &str {
    model.trim_start_matches("models/")
}

/// Split system messages into `systemInstruction`; map assistant to `model`
fn build_contents(messages: &[Message]) -> (Vec<Value>, Option<Value>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = match m.role {
                Role::Assistant => "model",
                _ => "user",
            };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let system_instruction =
        (!system.is_empty()).then(|| json!({ "parts": [{ "text": system.join("\n\n") }] }));

    (contents, system_instruction)
}

impl Backend for Gemini {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn default_base_url(&self) -> &'static str {
        "https://generativelanguage.googleapis.com/v1beta"
    }
}

impl ChatBackend for Gemini {
    fn default_max_output_tokens(&self) -> u32 {
        8192
    }

    fn chat_request(
        &self,
        endpoint: &Endpoint,
        messages: &[Message],
        params: &ChatParams,
        stream: bool,
    ) -> Result<HttpRequest> {
        let (contents, system_instruction) = build_contents(messages);
        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": params.max_tokens,
                "temperature": params.temperature,
            },
        });
        if let Some(system_instruction) = system_instruction {
            body["systemInstruction"] = system_instruction;
        }

        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        let url = format!(
            "{}/models/{}:{}",
            endpoint.base_url,
            model_path(&params.model),
            method
        );

        let mut request = HttpRequest::post_json(url, body);
        if let Some(key) = endpoint.api_key() {
            request = request.header(API_KEY_HEADER, key);
        }
        Ok(request)
    }

    fn parse_chat_response(&self, body: &[u8]) -> Result<ChatResult> {
        let response: GenerateResponse = decode_json(self.name(), body)?;
        let usage = response
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(ChatResult {
            id: response.response_id,
            model: response.model_version,
            choices: response
                .candidates
                .iter()
                .map(|c| Choice {
                    index: c.index,
                    message: Message::assistant(c.text()),
                    finish_reason: c.finish_reason.clone(),
                })
                .collect(),
            usage,
        })
    }

    fn parse_stream_payload(&self, payload: &str) -> Result<StreamPayload> {
        let response: GenerateResponse = decode_json(self.name(), payload.as_bytes())?;
        let usage = response
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count));
        let candidate = response.candidates.first();

        if candidate.is_none() && usage.is_none() {
            return Ok(StreamPayload::Skip);
        }

        Ok(StreamPayload::Chunk(StreamChunk {
            delta: candidate.map(Candidate::text).unwrap_or_default(),
            finish_reason: candidate.and_then(|c| c.finish_reason.clone()),
            usage,
            done: false,
        }))
    }

    fn chat_pricing(&self, model: &str) -> ModelPricing {
        lookup_by_prefix(CHAT_PRICING, model, DEFAULT_CHAT_PRICING)
    }
}

impl EmbeddingBackend for Gemini {
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
        let model = model_path(model);
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                let mut request = json!({
                    "model": format!("models/{}", model),
                    "content": { "parts": [{ "text": text }] },
                });
                if let Some(dimensions) = dimensions {
                    request["outputDimensionality"] = json!(dimensions);
                }
                request
            })
            .collect();

        let url = format!(
            "{}/models/{}:batchEmbedContents",
            endpoint.base_url, model
        );
        let mut request = HttpRequest::post_json(url, json!({ "requests": requests }));
        if let Some(key) = endpoint.api_key() {
            request = request.header(API_KEY_HEADER, key);
        }
        Ok(request)
    }

    fn parse_embedding_response(&self, body: &[u8], texts: &[String]) -> Result<EmbeddingResult> {
        let response: BatchEmbedResponse = decode_json(self.name(), body)?;
        let tokens: u64 = texts.iter().map(|t| estimate_tokens(t) as u64).sum();

        Ok(EmbeddingResult {
            embeddings: response
                .embeddings
                .into_iter()
                .enumerate()
                .map(|(index, e)| Embedding {
                    index,
                    vector: e.values,
                })
                .collect(),
            model: String::new(),
            usage: Usage::prompt_only(tokens),
        })
    }

    fn embedding_price_per_million(&self, model: &str) -> f64 {
        lookup_by_prefix(EMBEDDING_PRICING, model, DEFAULT_EMBEDDING_PRICE)
    }
}
