//! CLI command handlers

pub mod chat;
pub mod embed;
pub mod split;
pub mod validate;

use std::path::Path;
use wikismith_core::{Config, Result};

/// Load the explicit or default config and fill credentials from the environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.resolve_credentials();
    Ok(config)
}
