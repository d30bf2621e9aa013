//! Parlance - Terminal chat client
//!
#![doc = "Parlance - Terminal chat client"]
#![doc = "Main entry point for the Parlance application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parlance::cli::{Cli, Commands};
use parlance::commands;
use parlance::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Signup { email } => {
            tracing::info!("Starting signup");
            commands::account::run_signup(config, email).await?;
            Ok(())
        }
        Commands::Login { email } => {
            tracing::info!("Starting login");
            commands::account::run_login(config, email).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::account::run_logout(config)?;
            Ok(())
        }
        Commands::Plan { tier } => {
            tracing::info!("Selecting plan: {}", tier);
            commands::account::run_plan(config, &tier)?;
            Ok(())
        }
        Commands::Chat { resume } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(r) = &resume {
                tracing::debug!("Resuming conversation: {}", r);
            }

            // Moves `config` into the handler (match arms are exclusive)
            commands::chat::run_chat(config, resume).await?;
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
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "parlance=debug"
    } else {
        "parlance=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
