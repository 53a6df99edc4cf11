//! alertcast CLI
//!
//! Runs one polling cycle per invocation. Schedule it (cron, systemd timer)
//! so that no two cycles overlap.

use std::path::PathBuf;

use alertcast::{
    error::Result,
    models::Config,
    pipeline,
    services::NwsAlertSource,
    storage::{LocalStorage, StateStorage},
};
use clap::{Parser, Subcommand};

/// alertcast - Zone Weather Alert Poller
#[derive(Parser, Debug)]
#[command(
    name = "alertcast",
    version,
    about = "Polls zone weather alerts and decides alert / all-clear announcements"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one polling cycle and print the outcome as JSON
    Run {
        /// Override the state file path from the configuration
        #[arg(long)]
        state: Option<PathBuf>,

        /// Pretty-print the JSON outcome
        #[arg(long)]
        pretty: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show the persisted state
    State {
        /// Override the state file path from the configuration
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

/// Initialize logging; `RUST_LOG` overrides the configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    init_logging(cli.verbose, &config.logging.level);
    config.validate()?;

    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run { state, pretty } => {
            if let Some(path) = state {
                config.state.path = path;
            }

            let source = NwsAlertSource::new(&config.api)?;
            let mut storage = LocalStorage::new(&config.state.path);
            let outcome = pipeline::run_cycle(&config, &source, &mut storage).await?;

            let json = if pretty {
                serde_json::to_string_pretty(&outcome)?
            } else {
                serde_json::to_string(&outcome)?
            };
            println!("{json}");
        }

        Command::Validate => {
            log::info!(
                "Config OK: {} zones, {} global blocklist patterns",
                config.alerting.county_codes.len(),
                config.blocked_events.global.len()
            );
        }

        Command::State { state } => {
            let path = state.unwrap_or_else(|| config.state.path.clone());
            let mut storage = LocalStorage::new(&path);
            let state = storage.load().await?;

            log::info!("State file: {}", path.display());
            log::info!("Active alert types: {}", state.last_alerts.len());
            for (alert_type, records) in state.last_alerts.iter() {
                log::info!("    {} ({} zones)", alert_type, records.len());
            }
            log::info!("Last announced types: {}", state.last_say_alert.len());
            match state.last_all_clear {
                Some(at) => log::info!("Last all-clear: {}", at.to_rfc3339()),
                None => log::info!("No all-clear recorded"),
            }
        }
    }

    Ok(())
}
