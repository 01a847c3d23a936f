//! PinChat CLI: the main entry point.
//!
//! Commands:
//! - `serve`     : start the HTTP API
//! - `hash-pin`  : print the Argon2id hash of a PIN
//! - `provision` : create a PIN record in the configured store
//! - `doctor`    : diagnose configuration and store health

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "pinchat",
    about = "PinChat: PIN-authenticated chat backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the Argon2id hash for a PIN
    HashPin {
        /// The PIN to hash
        pin: String,
    },

    /// Create a PIN record in the configured store
    Provision {
        /// Use this PIN instead of generating one
        #[arg(long)]
        pin: Option<String>,
    },

    /// Diagnose configuration and store health
    Doctor {
        /// Also call the model provider's health endpoint
        #[arg(long)]
        check_provider: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::HashPin { pin } => commands::hash_pin::run(&pin).await?,
        Commands::Provision { pin } => commands::provision::run(pin).await?,
        Commands::Doctor { check_provider } => commands::doctor::run(check_provider).await?,
    }

    Ok(())
}
