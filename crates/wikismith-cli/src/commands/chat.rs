//! Chat command

use crate::app::{ChatArgs, OutputFormat};
use anyhow::Result;
use serde_json::json;
use std::io::{self, Write};
use tokio_util::sync::CancellationToken;
use wikismith_core::llm::StreamChunk;
use wikismith_core::{
    create_chat_provider, ChatOptions, ChatProvider, Config, Message, UsageStats,
};

pub async fn run(args: ChatArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let provider = create_chat_provider(config.chat.clone())?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut options = ChatOptions::default().with_cancel(cancel);
    if let Some(max_tokens) = args.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = args.temperature {
        options = options.with_temperature(temperature);
    }

    tracing::debug!(
        "Chatting with {}/{}",
        provider.provider_name(),
        provider.model_name()
    );

    if args.stream {
        let mut stdout = io::stdout();
        let mut content = String::new();
        provider
            .complete_stream(
                &messages,
                &mut |chunk: &StreamChunk| -> wikismith_core::Result<()> {
                    match format {
                        // One JSON document on stdout, so deltas are buffered
                        OutputFormat::Json => content.push_str(&chunk.delta),
                        OutputFormat::Cli => {
                            stdout.write_all(chunk.delta.as_bytes())?;
                            stdout.flush()?;
                        }
                    }
                    Ok(())
                },
                &options,
            )
            .await?;

        match format {
            OutputFormat::Json => {
                let output = json!({
                    "content": content,
                    "usage_stats": provider.usage_stats(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Cli => {
                println!();
                print_usage(&provider.usage_stats())?;
            }
        }
        return Ok(());
    }

    let result = provider.complete(&messages, &options).await?;
    match format {
        OutputFormat::Json => {
            let output = json!({
                "result": result,
                "usage_stats": provider.usage_stats(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Cli => {
            println!("{}", result.content());
            print_usage(&provider.usage_stats())?;
        }
    }
    Ok(())
}

fn print_usage(stats: &UsageStats) -> Result<()> {
    eprintln!(
        "Tokens: {} prompt + {} completion = {} (est. ${:.6})",
        stats.prompt_tokens, stats.completion_tokens, stats.total_tokens, stats.estimated_cost
    );
    Ok(())
}
