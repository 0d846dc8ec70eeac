//! `campusdesk context` — Show exactly what the backend is sent.

use std::path::Path;

use campusdesk_chat::{KnowledgeBase, PromptComposer};
use campusdesk_config::AppConfig;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let kb = KnowledgeBase::load_or_embedded(config.knowledge.path.as_deref().map(Path::new))?;
    let composer = PromptComposer::from_prompt_file(
        config.knowledge.system_prompt_path.as_deref().map(Path::new),
        &kb,
    )?;

    match message {
        Some(msg) => println!("{}", composer.compose(&msg)),
        None => print!("{}", composer.context()),
    }

    eprintln!(
        "\n  {} entries, {} trigger rules, ~{} context chars",
        kb.len(),
        kb.triggers().len(),
        composer.context().len()
    );

    Ok(())
}
