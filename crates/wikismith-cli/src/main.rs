//! Wikismith CLI
//!
//! Chat, embed and validate wiki structures from the command line.

use anyhow::Result;
use clap::Parser;
use wikismith_core::error::exit_codes;
use wikismith_core::WikismithError;

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat(args) => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::chat::run(args, &config, cli.format).await
        }
        Commands::Embed(args) => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::embed::run(args, &config, cli.format).await
        }
        Commands::Split(args) => commands::split::run(args, cli.format),
        Commands::Validate(args) => commands::validate::run(args, cli.format),
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<WikismithError>()
        .map(WikismithError::exit_code)
        .unwrap_or(exit_codes::GENERAL_ERROR)
}
