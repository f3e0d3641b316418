use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listfeed_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "listfeed")]
#[command(author, version, about = "Serve a scraped blog listing as an RSS feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (defaults to ~/.config/listfeed/config.toml)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on, overriding server.bind_addr
        #[arg(short = 'b', long)]
        bind: Option<String>,
    },
    /// Print the current feed to stdout
    Render,
    /// Fetch the listing now, ignoring the cache TTL
    Refresh,
    /// Show the cached snapshot
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match cli.config {
        Some(ref path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Some(Commands::Serve { bind }) => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
                config.validate()?;
            }
            commands::serve::run(Arc::new(config)).await
        }
        None => commands::serve::run(Arc::new(config)).await,
        Some(Commands::Render) => commands::render::run(&config).await,
        Some(Commands::Refresh) => commands::refresh::run(&config).await,
        Some(Commands::Status) => commands::status::run(&config).await,
    }
}
