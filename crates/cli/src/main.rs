//! Citeweave CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP API server
//! - `search`: Search papers for a topic
//! - `select`: Select papers for the generation context
//! - `generate`: Draft an Introduction or Related Works section
//! - `chat`: Chat with a provider, one message or interactive
//! - `config`: Show, locate, or validate configuration
//!
//! Every command shares the persisted state file, so a search in one
//! invocation feeds a generation in the next.

use citeweave_core::ProviderKind;
use citeweave_research::SectionKind;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "citeweave",
    about = "Citeweave: citation-grounded literature review drafting",
    version
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
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search papers for a topic
    Search {
        /// Research topic
        topic: String,

        /// Page of results to show (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Select papers for the generation context
    Select {
        /// Paper ids to add to the selection
        #[arg(conflicts_with_all = ["all", "clear"])]
        ids: Vec<String>,

        /// Fetch every result for the current topic and select it
        #[arg(long, conflicts_with = "clear")]
        all: bool,

        /// Maximum papers fetched by --all
        #[arg(long, requires = "all")]
        limit: Option<usize>,

        /// Clear the selection
        #[arg(long)]
        clear: bool,
    },

    /// Draft a section from the selected papers
    Generate {
        /// `introduction` or `related-works`
        section: SectionKind,

        /// Research topic (defaults to the last search)
        #[arg(short, long)]
        topic: Option<String>,

        /// Provider to use (defaults to the active provider)
        #[arg(long)]
        provider: Option<ProviderKind>,
    },

    /// Chat with a provider
    Chat {
        /// Provider to chat with (defaults to the active provider)
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show,
    /// Print the config file location
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing. Logs go to stderr so command output stays clean.
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
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Search { topic, page } => commands::search::run(&topic, page).await?,
        Commands::Select {
            ids,
            all,
            limit,
            clear,
        } => commands::select::run(ids, all, limit, clear).await?,
        Commands::Generate {
            section,
            topic,
            provider,
        } => commands::generate::run(section, topic, provider).await?,
        Commands::Chat { provider, message } => commands::chat::run(provider, message).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
