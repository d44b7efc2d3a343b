//! RoomWarden CLI: operator entry point.
//!
//! Commands:
//! - `init`    Write the default config file
//! - `config`  Show, locate or validate the effective configuration
//! - `tools`   Print the tool definitions offered to the model
//! - `invoke`  Run one tool call through the dispatcher

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "roomwarden",
    about = "RoomWarden: session lifecycle controller for real-time voice agents",
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
    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the advertised tool definitions as JSON
    Tools,

    /// Invoke a tool the way the model would
    Invoke {
        /// Tool name, e.g. `current_time` or `fetch_feed`
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Invocation id echoed on the reply
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration with secrets redacted
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

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
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Tools => commands::tools::run().await?,
        Commands::Invoke { name, args, id } => {
            return commands::invoke::run(name, args, id).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}
