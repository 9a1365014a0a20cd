//! Wikismith Core Library
//!
//! Core functionality for turning a source repository into a generated wiki.
//!
//! # Features
//! - One chat and embedding contract over OpenAI, Gemini and Ollama
//! - Rate-limited, retrying HTTP transport with cancellation
//! - Streaming completions over SSE and NDJSON
//! - Per-provider usage and cost accounting
//! - Extraction and validation of model-planned wiki structures
//! - Bounded-concurrency page generation

pub mod config;
pub mod error;
pub mod llm;
pub mod wiki;

pub use config::{Config, ProviderConfig};
pub use error::{Error, Result, StructureError, WikismithError};
pub use llm::{
    create_chat_provider, create_embedding_provider, ChatOptions, ChatProvider, ChatResult,
    EmbeddingOptions, EmbeddingProvider, EmbeddingResult, Message, ProviderRegistry, Role,
    StreamChunk, Usage, UsageStats,
};
pub use wiki::{
    parse_model_response, validate_structure, DocumentRetriever, GenerationOptions,
    GenerationReport, GenerationStats, ProgressTracker, ProjectContext, WikiForest,
    WikiGenerator, WikiPageRequest, WikiStructure,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "wikismith";
