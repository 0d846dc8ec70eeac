//! `campusdesk ask` — Single-message or interactive chat in the terminal.

use std::io::Write;

use campusdesk_chat::ChatService;
use campusdesk_config::{API_KEY_ENV, AppConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for the API key early
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set it in the environment or in a .env file:");
        eprintln!("    {API_KEY_ENV}=AIza...");
        eprintln!();
        eprintln!("  Or run `campusdesk onboard` to create the templates.");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = campusdesk_providers::build_from_config(&config)?;
    let chat = ChatService::from_config(&config, provider)?;
    let session = session.as_deref();

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = chat.respond(session, &msg).await?;
        eprint!("\r              \r");
        println!("{}", reply.response);
        return Ok(());
    }

    println!();
    println!("  CampusDesk — {}", chat.knowledge().subject());
    println!("  Model:     {}", config.backend.model);
    println!("  Knowledge: {} entries", chat.knowledge().len());
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        match chat.respond(session, line).await {
            Ok(reply) => {
                eprint!("\r     \r");
                println!();
                for text in reply.response.lines() {
                    println!("  CampusDesk > {text}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}
