//! Error types for wikismith

use thiserror::Error;

/// Result type alias using WikismithError
pub type Result<T> = std::result::Result<T, WikismithError>;

/// Error type alias for convenience
pub type Error = WikismithError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for wikismith
#[derive(Debug, Error)]
pub enum WikismithError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{provider}: transport error: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider}: API error (HTTP {status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: request failed after {attempts} attempt(s): {source}")]
    RetryExhausted {
        provider: String,
        attempts: u32,
        #[source]
        source: Box<WikismithError>,
    },

    #[error("{0}: cancelled while waiting for rate limiter")]
    RateLimitExceeded(String),

    #[error("{0}: request cancelled")]
    Cancelled(String),

    #[error("{provider}: failed to decode response: {message}")]
    Decode { provider: String, message: String },

    #[error("No <{0}> block found in model response")]
    NoStructuredBlockFound(String),

    #[error("Invalid wiki structure: {0}")]
    Structure(#[from] StructureError),

    #[error("Page '{page_id}' failed: {source}")]
    PageGeneration {
        page_id: String,
        #[source]
        source: Box<WikismithError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Structural violations found while validating a wiki structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("title is empty")]
    EmptyTitle,

    #[error("no pages defined")]
    NoPages,

    #[error("page #{0} has no id")]
    MissingPageId(usize),

    #[error("page '{0}' has no title")]
    MissingPageTitle(String),

    #[error("duplicate page id '{0}'")]
    DuplicatePageId(String),

    #[error("page '{id}' references unknown parent '{parent}'")]
    UnknownParent { id: String, parent: String },

    #[error("page '{0}' is part of a parent cycle")]
    ParentCycle(String),

    #[error("malformed structure: {0}")]
    Malformed(String),
}

impl WikismithError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_)
            | Self::UnsupportedProvider(_)
            | Self::InvalidInput(_)
            | Self::NoStructuredBlockFound(_)
            | Self::Structure(_) => exit_codes::INVALID_INPUT,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => exit_codes::NOT_FOUND,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether the transport should try the request again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this error should abort a whole generation run
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::UnsupportedProvider(_)
            | Self::RetryExhausted { .. }
            | Self::RateLimitExceeded(_)
            | Self::Cancelled(_) => true,
            Self::PageGeneration { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}
