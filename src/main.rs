//! mailuo - Chinese narrative analysis into a property graph
//!
//! Usage:
//!   mailuo analyze novel.txt        Analyze and persist
//!   mailuo export novel.txt         Analyze to JSON, no store
//!   mailuo show <id>                Show a stored analysis
//!   mailuo --help                   Show all commands

use anyhow::Result;
use clap::Parser;

use mailuo::cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mailuo=info".parse()?),
        )
        .init();

    if let Err(err) = execute(&cli).await {
        if cli.json {
            let payload = serde_json::json!({
                "kind": err.kind(),
                "stage": err.stage(),
                "message": err.to_string(),
            });
            eprintln!("{payload}");
        } else {
            eprintln!("error: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}
