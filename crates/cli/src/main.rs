//! liftlog CLI: the main entry point.
//!
//! Commands:
//! - `ask`      Answer one question through the agent graph
//! - `gateway`  Start the HTTP API server
//! - `config`   Show the effective configuration or write a starter file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "liftlog",
    about = "liftlog: a tool-calling fitness coach agent",
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
    /// Ask the agent a single question
    Ask {
        /// The question, e.g. "get my workout history for user U1"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the effective configuration (secrets redacted)
    Config {
        /// Write a default config file instead
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask { question } => commands::ask::run(question.join(" ")).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Config { init } => commands::config_cmd::run(init).await?,
    }

    Ok(())
}
