//! SlashGPT CLI: the main entry point.
//!
//! Commands:
//! - `chat`      Interactive chat (default)
//! - `personas`  List the personas in the prompts directory

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slashgpt_config::AppConfig;

mod commands;
mod transcript;

#[derive(Parser)]
#[command(
    name = "slashgpt",
    about = "SlashGPT: slash-command chat with retrieval-augmented personas",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ./slashgpt.toml)
    #[arg(short, long, global = true, env = "SLASHGPT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding persona manifests
    #[arg(long, global = true)]
    prompts: Option<PathBuf>,

    /// Directory transcripts are written to
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model (default)
    Chat,

    /// List available personas
    Personas,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the chat
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config =
        AppConfig::load(cli.config.as_deref()).map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(prompts) = cli.prompts {
        config.paths.prompts_dir = prompts;
    }
    if let Some(output) = cli.output {
        config.paths.output_dir = output;
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(config).await?,
        Commands::Personas => commands::personas::run(&config)?,
    }

    Ok(())
}
