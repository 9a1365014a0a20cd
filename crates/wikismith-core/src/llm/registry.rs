//! Provider registry: backend name to constructed adapter

use super::backends::{Gemini, Ollama, OpenAi};
use super::chat::ChatAdapter;
use super::embedding::EmbeddingAdapter;
use super::traits::{ChatProvider, EmbeddingProvider};
use crate::config::ProviderConfig;
use crate::error::{Result, WikismithError};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a chat backend
pub type ChatConstructor = fn(ProviderConfig) -> Result<Arc<dyn ChatProvider>>;

/// Constructor for an embedding backend
pub type EmbeddingConstructor = fn(ProviderConfig) -> Result<Arc<dyn EmbeddingProvider>>;

/// Registry of backend constructors
pub struct ProviderRegistry {
    chat: HashMap<String, ChatConstructor>,
    embedding: HashMap<String, EmbeddingConstructor>,
}

impl ProviderRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self {
            chat: HashMap::new(),
            embedding: HashMap::new(),
        }
    }

    /// Create registry with the built-in backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register_chat("openai", |config| {
            Ok(Arc::new(ChatAdapter::new(OpenAi, config)?))
        });
        registry.register_chat("gemini", |config| {
            Ok(Arc::new(ChatAdapter::new(Gemini, config)?))
        });
        registry.register_chat("google", |config| {
            Ok(Arc::new(ChatAdapter::new(Gemini, config)?))
        });
        registry.register_chat("ollama", |config| {
            Ok(Arc::new(ChatAdapter::new(Ollama, config)?))
        });

        registry.register_embedding("openai", |config| {
            Ok(Arc::new(EmbeddingAdapter::new(OpenAi, config)?))
        });
        registry.register_embedding("gemini", |config| {
            Ok(Arc::new(EmbeddingAdapter::new(Gemini, config)?))
        });
        registry.register_embedding("google", |config| {
            Ok(Arc::new(EmbeddingAdapter::new(Gemini, config)?))
        });
        registry.register_embedding("ollama", |config| {
            Ok(Arc::new(EmbeddingAdapter::new(Ollama, config)?))
        });

        registry
    }

    /// Register a chat backend
    pub fn register_chat(&mut self, name: &str, constructor: ChatConstructor) {
        self.chat.insert(normalize_name(name), constructor);
    }

    /// Register an embedding backend
    pub fn register_embedding(&mut self, name: &str, constructor: EmbeddingConstructor) {
        self.embedding.insert(normalize_name(name), constructor);
    }

    /// Construct a chat provider from configuration
    pub fn create_chat(&self, config: Option<ProviderConfig>) -> Result<Arc<dyn ChatProvider>> {
        let config = checked(config, "chat")?;
        let constructor = self
            .chat
            .get(&normalize_name(&config.provider))
            .ok_or_else(|| WikismithError::UnsupportedProvider(config.provider.clone()))?;
        constructor(config)
    }

    /// Construct an embedding provider from configuration
    pub fn create_embedding(
        &self,
        config: Option<ProviderConfig>,
    ) -> Result<Arc<dyn EmbeddingProvider>> {
        let config = checked(config, "embedding")?;
        let constructor = self
            .embedding
            .get(&normalize_name(&config.provider))
            .ok_or_else(|| WikismithError::UnsupportedProvider(config.provider.clone()))?;
        constructor(config)
    }

    /// Registered chat backend names, sorted
    pub fn chat_providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chat.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered embedding backend names, sorted
    pub fn embedding_providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.embedding.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Construct a chat provider with the built-in backends
pub fn create_chat_provider(config: Option<ProviderConfig>) -> Result<Arc<dyn ChatProvider>> {
    ProviderRegistry::with_defaults().create_chat(config)
}

/// Construct an embedding provider with the built-in backends
pub fn create_embedding_provider(
    config: Option<ProviderConfig>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    ProviderRegistry::with_defaults().create_embedding(config)
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn checked(config: Option<ProviderConfig>, kind: &str) -> Result<ProviderConfig> {
    let config = config.ok_or_else(|| {
        WikismithError::Config(format!("{} provider configuration is missing", kind))
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_rejected() {
        let err = create_chat_provider(None).err().unwrap();
        assert!(matches!(err, WikismithError::Config(_)));

        let err = create_embedding_provider(None).err().unwrap();
        assert!(matches!(err, WikismithError::Config(_)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let config = ProviderConfig::new("watsonx", "granite").with_api_key("k");
        let err = create_chat_provider(Some(config)).err().unwrap();
        match err {
            WikismithError::UnsupportedProvider(name) => assert_eq!(name, "watsonx"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_numbers_rejected_before_dispatch() {
        // Unknown backend would be UnsupportedProvider; validation runs first
        let config = ProviderConfig::new("watsonx", "granite").with_requests_per_second(-1.0);
        let err = create_chat_provider(Some(config)).err().unwrap();
        assert!(matches!(err, WikismithError::Config(_)));
    }

    #[test]
    fn test_dispatch_by_name() {
        let chat = create_chat_provider(Some(
            ProviderConfig::new(" OpenAI ", "gpt-4o-mini").with_api_key("sk"),
        ))
        .unwrap();
        assert_eq!(chat.provider_name(), "openai");
        assert_eq!(chat.model_name(), "gpt-4o-mini");

        let chat = create_chat_provider(Some(
            ProviderConfig::new("google", "gemini-1.5-pro").with_api_key("g"),
        ))
        .unwrap();
        assert_eq!(chat.provider_name(), "gemini");

        let embedding =
            create_embedding_provider(Some(ProviderConfig::new("ollama", "all-minilm"))).unwrap();
        assert_eq!(embedding.provider_name(), "ollama");
        assert_eq!(embedding.dimensions(), 384);
    }

    #[test]
    fn test_missing_credential_rejected() {
        let err = create_embedding_provider(Some(ProviderConfig::new(
            "openai",
            "text-embedding-3-small",
        )))
        .err()
        .unwrap();
        assert!(matches!(err, WikismithError::Config(_)));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.chat_providers().is_empty());

        registry.register_chat("local-llama", |config| {
            Ok(Arc::new(ChatAdapter::new(Ollama, config)?))
        });
        assert_eq!(registry.chat_providers(), vec!["local-llama"]);

        let chat = registry
            .create_chat(Some(ProviderConfig::new("local-llama", "llama3")))
            .unwrap();
        assert_eq!(chat.provider_name(), "ollama");
        assert!(registry.embedding_providers().is_empty());
    }
}
