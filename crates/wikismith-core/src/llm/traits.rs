//! LLM trait definitions

use super::embedding::split_text_for_embedding;
use super::types::{
    ChatOptions, ChatResult, EmbeddingOptions, EmbeddingResult, Message, StreamChunk, UsageStats,
};
use super::usage::estimate_tokens;
use crate::error::Result;
use async_trait::async_trait;

/// Per-chunk streaming callback; an error aborts the stream
pub type StreamHandler<'a> = dyn FnMut(&StreamChunk) -> Result<()> + Send + 'a;

/// Chat completion provider
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Backend identifier (openai, gemini, ollama)
    fn provider_name(&self) -> &str;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Generate chat completion
    async fn complete(&self, messages: &[Message], options: &ChatOptions) -> Result<ChatResult>;

    /// Stream chat completion, delivering each chunk to `handler` in order
    async fn complete_stream(
        &self,
        messages: &[Message],
        handler: &mut StreamHandler<'_>,
        options: &ChatOptions,
    ) -> Result<()>;

    /// Estimated cost in USD
    fn estimate_cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64;

    /// Approximate token count
    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    fn usage_stats(&self) -> UsageStats;

    fn reset_usage_stats(&self);
}

/// Embedding generation provider
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Backend identifier (openai, gemini, ollama)
    fn provider_name(&self) -> &str;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Generate embeddings, one per input text, in input order
    async fn create_embeddings(
        &self,
        texts: &[String],
        options: &EmbeddingOptions,
    ) -> Result<EmbeddingResult>;

    /// Split text into chunks of at most `max_tokens` estimated tokens
    fn split_text_for_embedding(&self, text: &str, max_tokens: usize) -> Vec<String> {
        split_text_for_embedding(text, max_tokens)
    }

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Max input tokens per text
    fn max_tokens(&self) -> usize;

    /// Max texts per backend request
    fn max_batch_size(&self) -> usize;

    /// Estimated cost in USD
    fn estimate_cost(&self, tokens: u64) -> f64;

    /// Approximate token count
    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    fn usage_stats(&self) -> UsageStats;

    fn reset_usage_stats(&self);
}
