//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wikismith")]
#[command(
    author,
    version,
    about = "Talk to LLM providers and check model-planned wiki structures"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "WIKISMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one chat completion
    Chat(ChatArgs),

    /// Embed texts with the configured embedding provider
    Embed(EmbedArgs),

    /// Split a file into embedding-sized chunks
    Split(SplitArgs),

    /// Validate a model response containing a wiki structure
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct ChatArgs {
    /// User prompt
    pub prompt: String,

    /// System prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Print tokens as they arrive
    #[arg(long)]
    pub stream: bool,

    /// Max output tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,
}

#[derive(Args)]
pub struct EmbedArgs {
    /// Texts to embed
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Requested vector dimensions
    #[arg(long)]
    pub dimensions: Option<usize>,
}

#[derive(Args)]
pub struct SplitArgs {
    /// File to split
    pub file: PathBuf,

    /// Max estimated tokens per chunk
    #[arg(long, default_value = "512")]
    pub max_tokens: usize,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// File holding the raw model response
    pub file: PathBuf,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Cli,
    Json,
}
