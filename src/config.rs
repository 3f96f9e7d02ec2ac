//! Configuration management for Iriswear
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer defaults, an `iriswear.toml` file, `IRISWEAR_*`
//! environment variables, and command-line arguments. No component reads
//! configuration globally; the loaded value is passed to each component at
//! construction.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the bus connection.
    pub bus: BusConfig,
    /// Configuration for the notifier pipeline.
    pub notify: NotifyConfig,
    /// Configuration for the text-to-speech backend.
    pub speech: SpeechConfig,
}

/// Configuration for the bus connection.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BusConfig {
    /// The WebSocket URL of the bus broker.
    pub url: String,
    /// Topic carrying announcement payloads (raw text or JSON objects).
    pub announce_topic: String,
    /// Topic carrying notification payloads (JSON objects).
    pub notify_topic: String,
}

/// Configuration for the notifier pipeline.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifyConfig {
    /// Minimum priority for a notification to be re-announced. The default
    /// of 0 announces everything that doesn't carry a negative priority.
    pub announce_priority: i64,
}

/// Which text-to-speech backend to use.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackendKind {
    /// Pick the compile-target default (`say` on macOS, `espeak` on Linux).
    Auto,
    Say,
    Espeak,
    /// Run the argv configured in `speech.command`.
    Command,
}

/// Configuration for the text-to-speech backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpeechConfig {
    pub backend: SpeechBackendKind,
    /// Voice name passed to backends that support one (`say -v`).
    pub voice: Option<String>,
    /// Argv for the `command` backend; the text to speak is appended.
    #[serde(default)]
    pub command: Vec<String>,
}

impl Config {
    /// Loads the application configuration by layering sources: defaults,
    /// file, environment, and CLI arguments (highest precedence).
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = cli
            .config
            .as_deref()
            .unwrap_or_else(|| std::path::Path::new("iriswear.toml"));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            // Allow overriding with environment variables, e.g.
            // IRISWEAR_LOG_LEVEL=debug
            .merge(Env::prefixed("IRISWEAR_"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            bus: BusConfig {
                url: "ws://127.0.0.1:9001".to_string(),
                announce_topic: "/iriswear/announce".to_string(),
                notify_topic: "/iriswear/notify".to_string(),
            },
            notify: NotifyConfig {
                announce_priority: 0,
            },
            speech: SpeechConfig {
                backend: SpeechBackendKind::Auto,
                voice: None,
                command: vec![],
            },
        }
    }
}
