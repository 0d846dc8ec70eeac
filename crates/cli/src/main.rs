//! CampusDesk CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP gateway and chat page
//! - `ask`      — One question, or an interactive session, from the terminal
//! - `context`  — Print the knowledge context or a fully composed prompt
//! - `onboard`  — Write a config template and `.env` placeholder
//! - `doctor`   — Diagnose configuration and knowledge base

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "campusdesk",
    about = "CampusDesk — admissions FAQ assistant backed by an LLM",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a question through the full chat pipeline
    Ask {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Session to use when `session.mode = "per_client"`
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Print the rendered knowledge context
    Context {
        /// Print the full prompt composed for this question instead
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Write a config template and .env placeholder
    Onboard,

    /// Diagnose configuration and knowledge base
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before any config lookups read the environment
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, ".env not loaded, using process environment"),
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { message, session } => commands::ask::run(message, session).await?,
        Commands::Context { message } => commands::context::run(message).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
