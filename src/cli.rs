//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. Arguments are parsed at startup and merged, as the
//! highest-precedence layer, with the configuration from `iriswear.toml` and
//! the environment.

use clap::{ArgAction, Parser, Subcommand};
use figment::{
    providers::Serialized,
    value::{Dict, Map},
    Error, Metadata, Profile, Provider,
};
use serde::Serialize;
use std::path::PathBuf;

/// A message-bus-driven notification and announcement dispatcher.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// WebSocket URL of the bus broker.
    #[arg(long, value_name = "URL")]
    pub bus_url: Option<String>,

    /// Minimum priority for the notifier to re-announce a notification.
    #[arg(long, value_name = "PRIORITY")]
    pub announce_priority: Option<i64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the text-to-speech announcer.
    Announce,
    /// Start the notification daemon.
    Notify,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        #[derive(Serialize)]
        struct BusOverrides<'a> {
            url: &'a str,
        }

        #[derive(Serialize)]
        struct NotifyOverrides {
            announce_priority: i64,
        }

        #[derive(Serialize)]
        struct Overrides<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            log_level: Option<&'static str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            bus: Option<BusOverrides<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            notify: Option<NotifyOverrides>,
        }

        let overrides = Overrides {
            // Verbosity only raises the log level; an explicit log_level in
            // the config file still wins when no -v flag is given.
            log_level: match self.verbose {
                0 => None,
                1 => Some("debug"),
                _ => Some("trace"),
            },
            bus: self.bus_url.as_deref().map(|url| BusOverrides { url }),
            notify: self
                .announce_priority
                .map(|announce_priority| NotifyOverrides { announce_priority }),
        };

        Serialized::defaults(overrides).data()
    }
}
