//! Kondate - recipe-suggestion chat relay and terminal client
//!
//! Main entry point for the Kondate application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kondate::cli::{Cli, Commands};
use kondate::commands;
use kondate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse_args();

    // If the user supplied a data directory on the CLI, mirror it into
    // KONDATE_DATA_DIR so the repository initializer can pick it up. This
    // keeps callers unchanged while allowing `SledRepository::open_default()`
    // to honor an override.
    if let Some(data_dir) = &cli.data_dir {
        std::env::set_var("KONDATE_DATA_DIR", data_dir);
        tracing::info!("Using data directory override from CLI: {}", data_dir);
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { addr } => {
            tracing::info!("Starting relay server");
            commands::serve::run_serve(config, addr).await?;
            Ok(())
        }
        Commands::Chat { relay_url, resume } => {
            tracing::info!("Starting interactive chat client");
            if let Some(url) = &relay_url {
                tracing::debug!("Using relay URL override: {}", url);
            }
            if let Some(id) = &resume {
                tracing::debug!("Resuming conversation: {}", id);
            }
            commands::chat::run_chat(config, relay_url, resume).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(&config, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kondate=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
