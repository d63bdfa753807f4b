//! Affinity CLI, the main entry point.
//!
//! Commands:
//! - `init`    : write the default config
//! - `chat`    : interactive or single-message chat with the companion
//! - `status`  : relationship row, level, and recent history
//! - `levels`  : the relationship band table
//! - `memory`  : episodic and fact memory for one relationship

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "affinity",
    about = "Affinity: a companion chat engine with evolving relationships",
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
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,

    /// Chat with the companion
    Chat {
        /// Your user id
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Companion id; defaults to the configured companion
        #[arg(short, long)]
        companion: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Print turn internals after each reply
        #[arg(long, env = "AFFINITY_DEBUG")]
        debug: bool,
    },

    /// Show the stored relationship and its recent history
    Status {
        #[arg(short, long, default_value = "local")]
        user: String,

        #[arg(short, long)]
        companion: Option<String>,

        /// History rows to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Print the relationship levels
    Levels,

    /// Show what the companion remembers
    Memory {
        #[arg(short, long, default_value = "local")]
        user: String,

        #[arg(short, long)]
        companion: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Init => commands::init::run()?,
        Commands::Chat {
            user,
            companion,
            message,
            debug,
        } => commands::chat::run(user, companion, message, debug).await?,
        Commands::Status { user, companion, limit } => commands::status::run(user, companion, limit).await?,
        Commands::Levels => commands::levels::run(),
        Commands::Memory { user, companion } => commands::memory::run(user, companion).await?,
    }

    Ok(())
}
