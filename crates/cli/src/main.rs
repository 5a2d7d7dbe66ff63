//! Ragline CLI
//!
//! Main entry point for the ragline command-line tool.
//! Provides conversational question answering over configured retrieval
//! back-ends, with streaming output and model fallback.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ChatCommand, ModelsCommand};
use ragline_core::{logging, AppConfig, AppResult};
use std::path::PathBuf;

/// Ragline CLI - conversational answers grounded in retrieved evidence
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(about = "Conversational answers grounded in retrieved evidence", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./ragline.yaml)
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Answer model key from the configured alternatives
    #[arg(short, long, global = true, env = "RAGLINE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question, optionally continuing a conversation
    Chat(ChatCommand),

    /// List the configured model alternatives
    Models(ModelsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration, then apply CLI overrides
    let config = AppConfig::load_from(cli.config.clone())?.with_overrides(
        cli.model.clone(),
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Ragline CLI starting");
    config.validate()?;
    config.log_startup();

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Models(_) => "models",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Models(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
