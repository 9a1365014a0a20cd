//! LLM integration
//!
//! Provides one contract over several HTTP backends:
//! - Chat completion (OpenAI, Gemini, Ollama), blocking and streaming
//! - Embedding generation with transparent batching
//! - Shared rate limiting, retry and usage accounting

pub mod backends;
mod chat;
mod embedding;
mod registry;
mod stream;
mod traits;
mod transport;
mod types;
mod usage;

pub use backends::{Backend, Endpoint, Gemini, Ollama, OpenAi};
pub use chat::{ChatAdapter, ChatBackend, ChatParams};
pub use embedding::{split_text_for_embedding, EmbeddingAdapter, EmbeddingBackend};
pub use registry::{
    create_chat_provider, create_embedding_provider, ChatConstructor, EmbeddingConstructor,
    ProviderRegistry,
};
pub use stream::{LineDecoder, StreamFraming, StreamPayload};
pub use traits::{ChatProvider, EmbeddingProvider, StreamHandler};
pub use transport::{HttpRequest, HttpResponse, RateLimiter, RetryPolicy, Transport};
pub use types::*;
pub use usage::{estimate_tokens, lookup_by_prefix, ModelPricing, UsageTracker};

/// OpenAI chat provider
pub type OpenAiChatProvider = ChatAdapter<OpenAi>;
/// Gemini chat provider
pub type GeminiChatProvider = ChatAdapter<Gemini>;
/// Ollama chat provider
pub type OllamaChatProvider = ChatAdapter<Ollama>;
/// OpenAI embedding provider
pub type OpenAiEmbeddingProvider = EmbeddingAdapter<OpenAi>;
/// Gemini embedding provider
pub type GeminiEmbeddingProvider = EmbeddingAdapter<Gemini>;
/// Ollama embedding provider
pub type OllamaEmbeddingProvider = EmbeddingAdapter<Ollama>;
