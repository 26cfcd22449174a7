//! PropDesk CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  : Create the default config file
//! - `serve`    : Start the HTTP gateway for one surface
//! - `ask`      : Run one assistant task through the access guard
//! - `check`    : Print the access decision for a resource
//! - `templates`: Show every task kind and its rendered prompt
//! - `doctor`   : Diagnose configuration health

use clap::{Parser, Subcommand};
use propdesk_core::OperatingContext;

mod commands;

#[derive(Parser)]
#[command(
    name = "propdesk",
    about = "PropDesk: role-gated AI assistant for real estate teams",
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
    /// Create ~/.propdesk/config.toml with defaults
    Onboard,

    /// Start the HTTP gateway for one surface
    Serve {
        /// Which surface to serve (admin or client)
        #[arg(short, long)]
        surface: OperatingContext,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one assistant task
    Ask {
        /// Which surface to ask from (admin or client)
        #[arg(short, long)]
        surface: OperatingContext,

        /// Task kind, e.g. generate-listing-description
        #[arg(short, long)]
        task: String,

        /// Input as JSON; anything that is not valid JSON is sent as text
        #[arg(short, long)]
        input: Option<String>,

        /// Bearer token identifying the caller
        #[arg(long, env = "PROPDESK_TOKEN")]
        token: Option<String>,
    },

    /// Print the access decision for a resource
    Check {
        /// Resource id, e.g. admin.dashboard
        #[arg(short, long)]
        resource: String,

        /// Bearer token identifying the caller
        #[arg(long, env = "PROPDESK_TOKEN")]
        token: Option<String>,
    },

    /// List task kinds and their rendered prompts
    Templates {
        /// Sample input (JSON or text) to render with
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Diagnose configuration health
    Doctor,
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
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { surface, port } => commands::serve::run(surface, port).await?,
        Commands::Ask {
            surface,
            task,
            input,
            token,
        } => commands::ask::run(surface, task, input, token).await?,
        Commands::Check { resource, token } => commands::check::run(resource, token).await?,
        Commands::Templates { input } => commands::templates::run(input)?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
