//! Split command

use crate::app::{OutputFormat, SplitArgs};
use anyhow::Result;
use serde_json::json;
use wikismith_core::llm::{estimate_tokens, split_text_for_embedding};
use wikismith_core::WikismithError;

pub fn run(args: SplitArgs, format: OutputFormat) -> Result<()> {
    if args.max_tokens == 0 {
        return Err(WikismithError::InvalidInput("--max-tokens must be positive".to_string()).into());
    }

    let text = std::fs::read_to_string(&args.file).map_err(WikismithError::from)?;
    let chunks = split_text_for_embedding(&text, args.max_tokens);

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = chunks
                .iter()
                .map(|chunk| json!({ "tokens": estimate_tokens(chunk), "text": chunk }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Cli => {
            for (i, chunk) in chunks.iter().enumerate() {
                println!("--- chunk {} (~{} tokens) ---", i + 1, estimate_tokens(chunk));
                println!("{}", chunk);
            }
            eprintln!("{} chunks", chunks.len());
        }
    }
    Ok(())
}
