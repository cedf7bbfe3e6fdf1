//! Membridge CLI - command dispatcher for the memory bridge
//!
//! Maps one process invocation to one bridge operation and prints exactly
//! one JSON object on stdout: either the operation's envelope (exit 0,
//! even for `{"success": false}`) or `{"error": ...}` for dispatcher-level
//! failures (exit 1). Logs go to stderr so stdout stays parseable.

use clap::error::ErrorKind;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use membridge::bridge::Bridge;
use membridge::config::Config;
use membridge_cli::commands::Command;
use membridge_cli::error::{CliError, CliResult};

/// Membridge - CLI bridge for a self-hosted semantic memory stack
#[derive(Parser)]
#[command(name = "membridge")]
#[command(about = "CLI bridge exposing memory-store operations over Qdrant and OpenAI embeddings")]
#[command(version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(e) => fail(&CliError(e.to_string())),
    };

    if let Err(e) = run(cli).await {
        fail(&e);
    }
}

/// Print the dispatcher-level error envelope and exit non-zero.
fn fail(e: &CliError) -> ! {
    println!("{}", json!({ "error": e.to_string() }));
    std::process::exit(1);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the JSON contract; all logging goes to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = Config::from_env()?;

    let mut bridge = Bridge::new(config);
    bridge.initialize().await;

    let envelope = cli.command.execute(&bridge).await?;
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}
