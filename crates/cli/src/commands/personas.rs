//! `slashgpt personas`: list the personas in the prompts directory.

use colored::Colorize;
use slashgpt_config::AppConfig;
use slashgpt_core::manifest::ManifestStore;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let manifests = ManifestStore::load_dir(&config.paths.prompts_dir)?;

    if manifests.is_empty() {
        println!(
            "No personas found in {}",
            config.paths.prompts_dir.display()
        );
        return Ok(());
    }

    for (key, manifest) in manifests.iter() {
        let title = manifest.title.as_deref().unwrap_or_default();
        match manifest.articles.as_deref() {
            Some(index) => println!("{:<16} {title} [{index}]", format!("/{key}").bold()),
            None => println!("{:<16} {title}", format!("/{key}").bold()),
        }
    }

    Ok(())
}
