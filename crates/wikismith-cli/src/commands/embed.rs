//! Embed command

use crate::app::{EmbedArgs, OutputFormat};
use anyhow::Result;
use serde_json::json;
use wikismith_core::{create_embedding_provider, Config, EmbeddingOptions, EmbeddingProvider};

/// Leading vector components shown per text
const PREVIEW_LEN: usize = 4;

pub async fn run(args: EmbedArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let provider = create_embedding_provider(config.embedding.clone())?;

    let mut options = EmbeddingOptions::default();
    if let Some(dimensions) = args.dimensions {
        options = options.with_dimensions(dimensions);
    }

    let result = provider.create_embeddings(&args.texts, &options).await?;
    let dimensions = result
        .embeddings
        .first()
        .map(|e| e.vector.len())
        .unwrap_or_else(|| provider.dimensions());

    match format {
        OutputFormat::Json => {
            let output = json!({
                "provider": provider.provider_name(),
                "model": result.model,
                "count": result.embeddings.len(),
                "dimensions": dimensions,
                "usage": result.usage,
                "estimated_cost": provider.usage_stats().estimated_cost,
                "embeddings": result.embeddings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Cli => {
            println!(
                "{} embeddings from {}/{} ({} dimensions)",
                result.embeddings.len(),
                provider.provider_name(),
                result.model,
                dimensions
            );
            for (embedding, text) in result.embeddings.iter().zip(&args.texts) {
                let preview: Vec<String> = embedding
                    .vector
                    .iter()
                    .take(PREVIEW_LEN)
                    .map(|v| format!("{:.4}", v))
                    .collect();
                println!("  [{}] {} -> [{}, ...]", embedding.index, text, preview.join(", "));
            }
            println!(
                "Tokens: {} (est. ${:.6})",
                result.usage.total_tokens,
                provider.usage_stats().estimated_cost
            );
        }
    }
    Ok(())
}
