//! Generic embedding adapter over a backend binding

use super::backends::{Backend, Endpoint};
use super::traits::EmbeddingProvider;
use super::transport::{HttpRequest, Transport};
use super::types::{Embedding, EmbeddingOptions, EmbeddingResult, Usage, UsageStats};
use super::usage::UsageTracker;
use crate::config::ProviderConfig;
use crate::error::{Result, WikismithError};
use async_trait::async_trait;

/// Wire binding for an embedding backend
pub trait EmbeddingBackend: Backend {
    /// Max texts per request
    fn max_batch_size(&self) -> usize;

    /// Dimensions for a model when not configured
    fn default_dimensions(&self, model: &str) -> usize;

    /// Max input tokens for a model when not configured
    fn default_max_input_tokens(&self, model: &str) -> usize;

    /// Build the wire request for one batch
    fn embedding_request(
        &self,
        endpoint: &Endpoint,
        model: &str,
        texts: &[String],
        dimensions: Option<usize>,
    ) -> Result<HttpRequest>;

    /// Map one batch response; indices are local to the batch
    fn parse_embedding_response(&self, body: &[u8], texts: &[String]) -> Result<EmbeddingResult>;

    /// USD per million input tokens
    fn embedding_price_per_million(&self, model: &str) -> f64;
}

/// Embedding provider built from a backend binding
pub struct EmbeddingAdapter<B: EmbeddingBackend> {
    backend: B,
    config: ProviderConfig,
    endpoint: Endpoint,
    transport: Transport,
    usage: UsageTracker,
}

impl<B: EmbeddingBackend> EmbeddingAdapter<B> {
    /// Create adapter; fails without a partially valid instance
    pub fn new(backend: B, config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = Endpoint::resolve(&backend, &config)?;
        let transport = Transport::new(backend.name(), &config)?;

        tracing::debug!(
            provider = backend.name(),
            model = %config.model,
            base_url = %endpoint.base_url,
            "Embedding provider created"
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

    async fn embed_batch(
        &self,
        batch: &[String],
        dimensions: Option<usize>,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<EmbeddingResult> {
        let request =
            self.backend
                .embedding_request(&self.endpoint, &self.config.model, batch, dimensions)?;
        let response = self.transport.execute(&request, cancel).await?;
        let mut result = self.backend.parse_embedding_response(&response.body, batch)?;

        if result.embeddings.len() != batch.len() {
            return Err(WikismithError::Decode {
                provider: self.backend.name().to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    result.embeddings.len()
                ),
            });
        }

        result.embeddings.sort_by_key(|e| e.index);
        Ok(result)
    }
}

#[async_trait]
impl<B: EmbeddingBackend> EmbeddingProvider for EmbeddingAdapter<B> {
    fn provider_name(&self) -> &str {
        self.backend.name()
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn create_embeddings(
        &self,
        texts: &[String],
        options: &EmbeddingOptions,
    ) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Err(WikismithError::InvalidInput(
                "no texts provided for embedding".to_string(),
            ));
        }

        let cancel = options.cancel.clone().unwrap_or_default();
        let dimensions = options.dimensions.or(self.config.dimensions);
        let batch_size = self.max_batch_size();
        let batch_count = texts.len().div_ceil(batch_size);

        let mut embeddings = Vec::with_capacity(texts.len());
        let mut usage = Usage::default();
        let mut model = String::new();

        for (batch_idx, batch) in texts.chunks(batch_size).enumerate() {
            tracing::debug!(
                provider = self.backend.name(),
                batch = batch_idx + 1,
                batches = batch_count,
                size = batch.len(),
                "Embedding batch"
            );

            let result = self.embed_batch(batch, dimensions, &cancel).await?;
            let offset = embeddings.len();
            embeddings.extend(
                result
                    .embeddings
                    .into_iter()
                    .enumerate()
                    .map(|(i, e)| Embedding {
                        index: offset + i,
                        vector: e.vector,
                    }),
            );
            usage.add(&result.usage);
            if model.is_empty() {
                model = result.model;
            }
        }

        if model.is_empty() {
            model = self.config.model.clone();
        }

        self.usage.record(&usage, self.estimate_cost(usage.prompt_tokens));

        Ok(EmbeddingResult {
            embeddings,
            model,
            usage,
        })
    }

    fn dimensions(&self) -> usize {
        self.config
            .dimensions
            .unwrap_or_else(|| self.backend.default_dimensions(&self.config.model))
    }

    fn max_tokens(&self) -> usize {
        self.config
            .max_input_tokens
            .unwrap_or_else(|| self.backend.default_max_input_tokens(&self.config.model))
    }

    fn max_batch_size(&self) -> usize {
        self.backend.max_batch_size().max(1)
    }

    fn estimate_cost(&self, tokens: u64) -> f64 {
        tokens as f64 * self.backend.embedding_price_per_million(&self.config.model) / 1_000_000.0
    }

    fn usage_stats(&self) -> UsageStats {
        self.usage.snapshot()
    }

    fn reset_usage_stats(&self) {
        self.usage.reset()
    }
}

/// Greedy word-wise packing into chunks of at most `max_tokens` estimated tokens
///
/// A single word longer than the budget becomes its own chunk; words are
/// never split or dropped.
pub fn split_text_for_embedding(text: &str, max_tokens: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate_len = current.chars().count() + 1 + word.chars().count();
        if candidate_len / 4 <= max_tokens {
            current.push(' ');
            current.push_str(word);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::backends::{Gemini, Ollama, OpenAi};
    use crate::llm::usage::estimate_tokens;
    use proptest::prelude::*;

    #[test]
    fn test_split_empty() {
        assert!(split_text_for_embedding("", 10).is_empty());
        assert!(split_text_for_embedding("   \n\t ", 10).is_empty());
    }

    #[test]
    fn test_split_packs_greedily() {
        // "aaa bbb" is 7 chars = 1 token, "aaa bbb ccc" is 11 chars = 2 tokens
        let chunks = split_text_for_embedding("aaa bbb ccc ddd", 1);
        assert_eq!(chunks, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_split_oversized_word_kept_whole() {
        let chunks = split_text_for_embedding("tiny supercalifragilistic end", 2);
        assert_eq!(chunks, vec!["tiny", "supercalifragilistic", "end"]);
    }

    #[test]
    fn test_split_normalizes_whitespace() {
        let chunks = split_text_for_embedding("one\n\ntwo   three", 100);
        assert_eq!(chunks, vec!["one two three"]);
    }

    proptest! {
        #[test]
        fn prop_split_preserves_words(
            words in prop::collection::vec("[a-z]{1,12}", 0..60),
            max_tokens in 3usize..40,
        ) {
            let text = words.join(" ");
            let chunks = split_text_for_embedding(&text, max_tokens);
            let rejoined = chunks.join(" ");
            prop_assert_eq!(rejoined.split_whitespace().count(), words.len());
            prop_assert_eq!(rejoined, text);
            for chunk in &chunks {
                prop_assert!(estimate_tokens(chunk) <= max_tokens);
            }
        }
    }

    #[test]
    fn test_dimensions_configured_or_table() {
        let config = ProviderConfig::new("openai", "text-embedding-3-large").with_api_key("sk");
        let adapter = EmbeddingAdapter::new(OpenAi, config.clone()).unwrap();
        assert_eq!(adapter.dimensions(), 3072);

        let adapter = EmbeddingAdapter::new(OpenAi, config.with_dimensions(256)).unwrap();
        assert_eq!(adapter.dimensions(), 256);

        let adapter =
            EmbeddingAdapter::new(Ollama, ProviderConfig::new("ollama", "unheard-of")).unwrap();
        assert_eq!(adapter.dimensions(), 768);
        assert_eq!(adapter.max_tokens(), 512);
    }

    #[test]
    fn test_max_tokens_configured_or_table() {
        let config = ProviderConfig::new("gemini", "text-embedding-004").with_api_key("k");
        let adapter = EmbeddingAdapter::new(Gemini, config.clone()).unwrap();
        assert_eq!(adapter.max_tokens(), 2048);
        assert_eq!(adapter.max_batch_size(), 100);

        let adapter = EmbeddingAdapter::new(Gemini, config.with_max_input_tokens(512)).unwrap();
        assert_eq!(adapter.max_tokens(), 512);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let adapter =
            EmbeddingAdapter::new(Ollama, ProviderConfig::new("ollama", "nomic-embed-text"))
                .unwrap();
        let err = adapter
            .create_embeddings(&[], &EmbeddingOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WikismithError::InvalidInput(_)));
        assert_eq!(adapter.usage_stats().requests, 0);
    }
}
