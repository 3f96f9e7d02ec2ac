//! Iriswear - message-bus notification dispatcher
//!
//! The binary hosts two daemons sharing one dispatch engine: `announce`
//! (bus → text-to-speech) and `notify` (bus → handler fan-out).

use anyhow::Result;
use clap::Parser;
use iriswear::{
    app::App,
    cli::{Cli, Command},
    config::Config,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment,
    // and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        // Exit if configuration fails, as it's a critical step.
        std::process::exit(1);
    });

    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Iriswear starting up");
    info!(
        bus_url = %config.bus.url,
        announce_topic = %config.bus.announce_topic,
        notify_topic = %config.bus.notify_topic,
        log_level = %config.log_level,
        "Configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = match cli.command {
        Command::Announce => App::announcer(&config, shutdown_rx),
        Command::Notify => App::notifier(&config, shutdown_rx),
    }
    .unwrap_or_else(|err| {
        error!("Failed to start: {err}");
        std::process::exit(1);
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    app.run().await
}
