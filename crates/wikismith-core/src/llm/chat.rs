//! Generic chat adapter over a backend binding

use super::backends::{Backend, Endpoint};
use super::stream::{LineDecoder, StreamFraming, StreamPayload};
use super::traits::{ChatProvider, StreamHandler};
use super::transport::{HttpRequest, Transport};
use super::types::{ChatOptions, ChatResult, Message, Usage, UsageStats};
use super::usage::{estimate_tokens, ModelPricing, UsageTracker};
use crate::config::ProviderConfig;
use crate::error::{Result, WikismithError};
use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// Resolved per-call generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ChatParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Wire binding for a chat completion backend
pub trait ChatBackend: Backend {
    fn framing(&self) -> StreamFraming {
        StreamFraming::Sse
    }

    fn default_max_output_tokens(&self) -> u32 {
        4096
    }

    fn default_temperature(&self) -> f32 {
        0.7
    }

    /// Build the wire request
    fn chat_request(
        &self,
        endpoint: &Endpoint,
        messages: &[Message],
        params: &ChatParams,
        stream: bool,
    ) -> Result<HttpRequest>;

    /// Map a non-streaming response body
    fn parse_chat_response(&self, body: &[u8]) -> Result<ChatResult>;

    /// Map one stream payload (already stripped of framing)
    fn parse_stream_payload(&self, payload: &str) -> Result<StreamPayload>;

    /// Price table lookup; unknown models fall back to a default tier
    fn chat_pricing(&self, model: &str) -> ModelPricing;
}

/// Chat provider built from a backend binding
pub struct ChatAdapter<B: ChatBackend> {
    backend: B,
    config: ProviderConfig,
    endpoint: Endpoint,
    transport: Transport,
    usage: UsageTracker,
}

impl<B: ChatBackend> ChatAdapter<B> {
    /// Create adapter; fails without a partially valid instance
    pub fn new(backend: B, config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = Endpoint::resolve(&backend, &config)?;
        let transport = Transport::new(backend.name(), &config)?;

        tracing::debug!(
            provider = backend.name(),
            model = %config.model,
            base_url = %endpoint.base_url,
            "Chat provider created"
        );

        Ok(Self {
            backend,
            config,
            endpoint,
            transport,
            usage: UsageTracker::new(),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Resolve params: call options, then config, then backend defaults
    pub fn params(&self, options: &ChatOptions) -> ChatParams {
        let temperature = options
            .temperature
            .filter(|t| *t >= 0.0)
            .or(self.config.temperature)
            .unwrap_or_else(|| self.backend.default_temperature());
        let max_tokens = options
            .max_tokens
            .or(self.config.max_tokens)
            .unwrap_or_else(|| self.backend.default_max_output_tokens());

        ChatParams {
            model: self.config.model.clone(),
            max_tokens,
            temperature,
        }
    }

    fn record(&self, usage: &Usage) {
        let cost = self.estimate_cost(usage.prompt_tokens, usage.completion_tokens);
        self.usage.record(usage, cost);
    }

    fn estimate_usage(&self, messages: &[Message], completion: &str) -> Usage {
        let prompt: usize = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        Usage::new(prompt as u64, estimate_tokens(completion) as u64)
    }

    /// Handle one decoded line; returns true when the stream is finished
    fn handle_line(
        &self,
        line: &str,
        handler: &mut StreamHandler<'_>,
        content: &mut String,
        reported: &mut Option<Usage>,
    ) -> Result<bool> {
        let Some(payload) = self.backend.framing().payload(line) else {
            return Ok(false);
        };

        match self.backend.parse_stream_payload(payload) {
            Ok(StreamPayload::Done) => Ok(true),
            Ok(StreamPayload::Skip) => Ok(false),
            Ok(StreamPayload::Chunk(chunk)) => {
                content.push_str(&chunk.delta);
                if chunk.usage.is_some() {
                    *reported = chunk.usage;
                }
                handler(&chunk)?;
                Ok(chunk.done)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.backend.name(),
                    "Skipping malformed stream chunk: {}",
                    e
                );
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl<B: ChatBackend> ChatProvider for ChatAdapter<B> {
    fn provider_name(&self) -> &str {
        self.backend.name()
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message], options: &ChatOptions) -> Result<ChatResult> {
        let cancel = options.cancel.clone().unwrap_or_default();
        let params = self.params(options);
        let request = self
            .backend
            .chat_request(&self.endpoint, messages, &params, false)?;

        let response = self.transport.execute(&request, &cancel).await?;
        let mut result = self.backend.parse_chat_response(&response.body)?;

        if result.model.is_empty() {
            result.model = params.model;
        }
        result.usage = if result.usage == Usage::default() {
            self.estimate_usage(messages, result.content())
        } else {
            Usage::new(result.usage.prompt_tokens, result.usage.completion_tokens)
        };

        self.record(&result.usage);
        tracing::debug!(
            provider = self.backend.name(),
            prompt_tokens = result.usage.prompt_tokens,
            completion_tokens = result.usage.completion_tokens,
            "Chat completion finished"
        );

        Ok(result)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        handler: &mut StreamHandler<'_>,
        options: &ChatOptions,
    ) -> Result<()> {
        let cancel: CancellationToken = options.cancel.clone().unwrap_or_default();
        let params = self.params(options);
        let request = self
            .backend
            .chat_request(&self.endpoint, messages, &params, true)?;

        let response = self.transport.execute_streaming(&request, &cancel).await?;
        let mut body = response.bytes_stream();
        let mut decoder = LineDecoder::new();
        let mut content = String::new();
        let mut reported: Option<Usage> = None;

        'read: loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(WikismithError::Cancelled(self.backend.name().to_string()));
                }
                next = body.next() => next,
            };

            let (lines, finished) = match next {
                Some(Ok(bytes)) => (decoder.push(&bytes), false),
                Some(Err(source)) => {
                    return Err(WikismithError::Transport {
                        provider: self.backend.name().to_string(),
                        source,
                    });
                }
                None => (decoder.finish().into_iter().collect(), true),
            };

            for line in lines {
                if self.handle_line(&line, handler, &mut content, &mut reported)? {
                    break 'read;
                }
            }

            if finished {
                break;
            }
        }

        let usage = match reported {
            Some(usage) => Usage::new(usage.prompt_tokens, usage.completion_tokens),
            None => self.estimate_usage(messages, &content),
        };
        self.record(&usage);

        Ok(())
    }

    fn estimate_cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        self.backend
            .chat_pricing(&self.config.model)
            .cost(prompt_tokens, completion_tokens)
    }

    fn usage_stats(&self) -> UsageStats {
        self.usage.snapshot()
    }

    fn reset_usage_stats(&self) {
        self.usage.reset()
    }
}
