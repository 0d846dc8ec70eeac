//! `campusdesk doctor` — Diagnose configuration and knowledge base.

use std::path::Path;

use campusdesk_chat::{KnowledgeBase, PromptComposer};
use campusdesk_config::{API_KEY_ENV, AppConfig};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 CampusDesk Doctor — System Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::resolve_path(|k| std::env::var(k).ok());
    if config_path.exists() {
        println!("  ✅ Config file: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file at {} — using defaults", config_path.display());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. Fix the configuration and re-run.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set {API_KEY_ENV} in the environment or .env");
        issues += 1;
    }

    match KnowledgeBase::load_or_embedded(config.knowledge.path.as_deref().map(Path::new)) {
        Ok(kb) => {
            println!(
                "  ✅ Knowledge base: {} ({} entries, {} trigger rules)",
                kb.subject(),
                kb.len(),
                kb.triggers().len()
            );
            for rule in kb.triggers() {
                if kb.get(&rule.section).is_none() {
                    println!(
                        "  ⚠️  Trigger '{}' points at missing entry '{}'",
                        rule.name, rule.section
                    );
                    issues += 1;
                }
            }

            match PromptComposer::from_prompt_file(
                config.knowledge.system_prompt_path.as_deref().map(Path::new),
                &kb,
            ) {
                Ok(composer) => println!(
                    "  ✅ System prompt loaded (~{} context chars per request)",
                    composer.context().len()
                ),
                Err(e) => {
                    println!("  ❌ System prompt: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Knowledge base: {e}");
            issues += 1;
        }
    }

    if config.has_api_key() {
        let provider = campusdesk_providers::build_from_config(&config)?;
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Backend reachable ({})", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Backend responded but reported unhealthy");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Backend check failed: {e}");
                issues += 1;
            }
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
