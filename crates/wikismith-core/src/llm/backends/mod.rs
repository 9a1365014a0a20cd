//! Backend bindings
//!
//! A binding only knows its wire format: endpoint paths, auth headers,
//! request/response mapping and price tables. Transport policy and usage
//! accounting live in the generic adapters.

mod gemini;
mod ollama;
mod openai;

pub use gemini::Gemini;
pub use ollama::Ollama;
pub use openai::OpenAi;

use crate::config::ProviderConfig;
use crate::error::{Result, WikismithError};
use crate::llm::types::Role;
use serde::de::DeserializeOwned;

/// Identity shared by chat and embedding bindings
pub trait Backend: Send + Sync + 'static {
    /// Backend identifier
    fn name(&self) -> &'static str;

    /// Base URL used when the config leaves it unset
    fn default_base_url(&self) -> &'static str;

    /// Whether construction must fail without an API key
    fn requires_api_key(&self) -> bool {
        true
    }
}

/// Resolved base URL and credential
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Endpoint {
    /// Resolve endpoint for a backend, failing if a required key is missing
    pub fn resolve<B: Backend + ?Sized>(backend: &B, config: &ProviderConfig) -> Result<Self> {
        let api_key = config.credential().map(str::to_string);
        if backend.requires_api_key() && api_key.is_none() {
            return Err(WikismithError::Config(format!(
                "{}: API key is required",
                backend.name()
            )));
        }
        Ok(Self {
            base_url: config.base_url_or(backend.default_base_url()),
            api_key,
        })
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// Decode a JSON body, mapping failures to a provider-tagged error
pub(crate) fn decode_json<T: DeserializeOwned>(provider: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| WikismithError::Decode {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// Map a wire role string onto the common vocabulary
pub(crate) fn parse_role(role: &str) -> Role {
    match role {
        "system" => Role::System,
        "user" => Role::User,
        _ => Role::Assistant,
    }
}
