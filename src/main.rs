//! # drydock - hook entry point
//!
//! 1. **Settings** - read `drydock.toml` (or the file given with `--config`)
//! 2. **Fact store** - open the durable store under the state directory
//! 3. **Dispatch** - run the hook's trigger through the reaction engine
//!
//! Workflow failures are reported through the status channel, not the exit
//! code. The process only fails when settings or the store are unusable.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use drydock::app::App;
use drydock::cli::{Cli, Commands};
use drydock::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let app = App::open(&settings).await?;

    match &cli.command {
        Commands::Flags => {
            for flag in app.flags().await?.iter() {
                println!("{flag}");
            }
        }
        Commands::Status => match app.status().await? {
            Some(record) => println!("{}: {} ({})", record.status, record.message, record.at),
            None => println!("unknown"),
        },
        Commands::ConfigChanged => {
            app.dispatch(app.config_changed()).await?;
        }
        command => {
            if let Some(trigger) = command.trigger() {
                app.dispatch(trigger).await?;
            }
        }
    }

    info!("drydock finished");
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
