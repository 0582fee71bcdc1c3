//! clipscribe CLI entry point.

use anyhow::Result;
use clap::Parser;
use clipscribe::cli::{commands, Cli, Commands, Output};
use clipscribe::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = match Settings::load_from(config_path.as_ref()) {
        Ok(settings) => settings,
        // `config init` must work before the file exists
        Err(e) if matches!(cli.command, Commands::Config { .. }) => {
            Output::warning(&format!("{}; using defaults", e));
            Settings::default()
        }
        Err(e) => return Err(e.into()),
    };

    // Initialize logging; -v flags override the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("clipscribe={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Run {
            documents,
            titles_only,
            skip_validation,
        } => {
            commands::run_pipeline(documents, *titles_only, *skip_validation, settings).await?;
        }

        Commands::Backup { documents, dir } => {
            commands::run_backup(documents, dir.as_deref(), settings).await?;
        }

        Commands::Apply { document } => {
            commands::run_apply(document.as_deref(), settings)?;
        }

        Commands::Review => {
            commands::run_review(settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, cli.config.as_deref())?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
