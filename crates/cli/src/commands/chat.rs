//! `citeweave chat`: Single-message or interactive chat with a provider.

use citeweave_core::ProviderKind;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    provider: Option<ProviderKind>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let workspace = super::open_workspace(&config).await?;
    let kind = match provider {
        Some(kind) => kind,
        None => workspace.active_provider().await,
    };

    if let Some(msg) = message {
        let exchange = workspace.chat(kind, &msg).await?;
        println!("{}", exchange.reply);
        return Ok(());
    }

    let settings = workspace.settings().await;
    let model = settings
        .models
        .get(&kind)
        .cloned()
        .flatten()
        .unwrap_or_else(|| "(none)".into());
    let earlier = workspace.chat_history(kind).await.len();

    println!();
    println!("  Citeweave chat: {kind}");
    println!("  Model:    {model}");
    println!("  History:  {earlier} earlier turns");
    println!();
    println!("  Type your message and press Enter.");
    println!("  '/clear' resets the conversation, 'exit' quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "exit" | "quit" => break,
            "/clear" => {
                workspace.clear_chat(kind).await;
                println!("  Conversation cleared.");
            }
            text => match workspace.chat(kind, text).await {
                Ok(exchange) => {
                    println!();
                    for reply_line in exchange.reply.lines() {
                        println!("  {kind} > {reply_line}");
                    }
                    println!();
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            },
        }
        prompt()?;
    }

    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    use std::io::Write;
    print!("  You > ");
    std::io::stdout().flush()
}
