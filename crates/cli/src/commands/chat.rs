//! `slashgpt chat`: the interactive loop.

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use slashgpt_agent::{ChatSession, Flow, ONELINE_HELP, Output, Shell, ShellSettings};
use slashgpt_config::{AppConfig, IndexBackend};
use slashgpt_core::index::IndexCatalog;
use slashgpt_core::manifest::ManifestStore;
use slashgpt_core::provider::Provider;
use slashgpt_index::LocalCatalog;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::transcript;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.require_credentials()?;

    let manifests = ManifestStore::load_dir(&config.paths.prompts_dir)?;
    let provider: Arc<dyn Provider> = Arc::new(slashgpt_providers::provider_from_config(&config)?);
    let catalog: Arc<dyn IndexCatalog> = match config.index.backend {
        IndexBackend::Pinecone => Arc::new(slashgpt_providers::pinecone_from_config(&config)?),
        IndexBackend::Local => Arc::new(LocalCatalog::load_dir(&config.index.local_dir)?),
    };
    let shell = Shell::new(provider, catalog, manifests, ShellSettings::from_config(&config));

    println!("Model = {}", config.openai.model);
    println!("{ONELINE_HELP}");

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut session = shell.new_session();

    loop {
        prompt(&session)?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match shell.handle(session, &line).await {
            Ok(turn) => {
                render(&turn.outputs);
                session = turn.session;
                match turn.flow {
                    Flow::Exit => break,
                    Flow::Replied => {
                        if let Err(e) = transcript::save(&config.paths.output_dir, &session) {
                            warn!(error = %e, "Failed to save transcript");
                        }
                    }
                    Flow::Continue => {}
                }
            }
            Err(failed) => {
                eprintln!("{} {}", "Error:".red().bold(), failed.error);
                session = failed.session;
            }
        }
    }

    Ok(())
}

fn prompt(session: &ChatSession) -> std::io::Result<()> {
    print!("{}", format!("{}: ", session.user_name()).magenta().bold());
    std::io::stdout().flush()
}

fn render(outputs: &[Output]) {
    for output in outputs {
        match output {
            Output::Notice(text) => println!("{text}"),
            Output::Bot { name, text } => println!("{}: {text}", name.green().bold()),
        }
    }
}
