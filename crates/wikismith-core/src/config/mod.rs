//! Configuration management

use crate::error::{Result, WikismithError};
use crate::wiki::GenerationOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chat completion backend
    #[serde(default)]
    pub chat: Option<ProviderConfig>,

    /// Embedding backend
    #[serde(default)]
    pub embedding: Option<ProviderConfig>,

    /// Wiki generation options
    #[serde(default)]
    pub generation: GenerationOptions,
}

/// Per-backend provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend identifier (openai, gemini, ollama)
    pub provider: String,

    /// API key (not required for credential-free backends)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// Base URL (falls back to the backend default when unset)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (0 disables the client timeout)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Additional attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for linear retry backoff
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Requests-per-second ceiling
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Default max output tokens for chat backends
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Default sampling temperature for chat backends
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Embedding dimensionality override
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Max input tokens per text for embedding backends
    #[serde(default)]
    pub max_input_tokens: Option<usize>,
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_requests_per_second() -> f64 {
    10.0
}

impl ProviderConfig {
    /// Create config with defaults for everything but backend and model
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: None,
            model: model.into(),
            base_url: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            requests_per_second: default_requests_per_second(),
            max_tokens: None,
            temperature: None,
            dimensions: None,
            max_input_tokens: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_requests_per_second(mut self, rps: f64) -> Self {
        self.requests_per_second = rps;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = Some(max_input_tokens);
        self
    }

    /// Request timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Base delay between retries
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Configured base URL without trailing slash, or the given default
    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    /// API key if present and non-blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// Backend-independent checks, run before any adapter is constructed
    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(WikismithError::Config("provider name is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(WikismithError::Config(format!(
                "{}: model name is empty",
                self.provider
            )));
        }
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(WikismithError::Config(format!(
                "{}: requests_per_second must be positive, got {}",
                self.provider, self.requests_per_second
            )));
        }
        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || temperature < 0.0 {
                return Err(WikismithError::Config(format!(
                    "{}: temperature must be non-negative, got {}",
                    self.provider, temperature
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from the default path, or defaults if it doesn't exist
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Fill missing API keys from the conventional environment variables
    pub fn resolve_credentials(&mut self) {
        for provider in [self.chat.as_mut(), self.embedding.as_mut()]
            .into_iter()
            .flatten()
        {
            if provider.credential().is_some() {
                continue;
            }
            provider.api_key = credential_env_vars(&provider.provider)
                .iter()
                .find_map(|var| std::env::var(var).ok())
                .filter(|key| !key.trim().is_empty());
        }
    }
}

fn credential_env_vars(provider: &str) -> &'static [&'static str] {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => &["OPENAI_API_KEY"],
        "gemini" | "google" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_yaml_defaults() {
        let yaml = r#"
chat:
  provider: openai
  model: gpt-4o-mini
  api_key: sk-test
embedding:
  provider: ollama
  model: nomic-embed-text
  requests_per_second: 2.5
generation:
  language: de
  max_concurrency: 4
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let chat = config.chat.unwrap();
        assert_eq!(chat.timeout_secs, 60);
        assert_eq!(chat.max_retries, 3);
        assert_eq!(chat.retry_delay(), Duration::from_secs(1));
        assert_eq!(chat.credential(), Some("sk-test"));

        let embedding = config.embedding.unwrap();
        assert_eq!(embedding.requests_per_second, 2.5);
        assert!(embedding.credential().is_none());

        assert_eq!(config.generation.language, "de");
        assert_eq!(config.generation.max_concurrency, 4);
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let base = ProviderConfig::new("openai", "gpt-4o");
        assert!(base.validate().is_ok());

        let zero_rps = base.clone().with_requests_per_second(0.0);
        assert!(matches!(zero_rps.validate(), Err(WikismithError::Config(_))));

        let nan_rps = base.clone().with_requests_per_second(f64::NAN);
        assert!(nan_rps.validate().is_err());

        let negative_temp = base.clone().with_temperature(-0.5);
        assert!(negative_temp.validate().is_err());

        let zero_temp = base.with_temperature(0.0);
        assert!(zero_temp.validate().is_ok());
    }

    #[test]
    fn test_base_url_or() {
        let config = ProviderConfig::new("ollama", "llama3");
        assert_eq!(
            config.base_url_or("http://localhost:11434"),
            "http://localhost:11434"
        );

        let config = config.with_base_url("http://gpu-box:11434/");
        assert_eq!(config.base_url_or("http://localhost:11434"), "http://gpu-box:11434");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "chat:\n  provider: gemini\n  model: gemini-1.5-flash\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chat.unwrap().provider, "gemini");
        assert!(config.embedding.is_none());
    }
}
