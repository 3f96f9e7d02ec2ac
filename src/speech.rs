//! Text-to-speech backends.
//!
//! Speech is rendered by spawning a platform command and waiting for it to
//! exit, so a `speak` call blocks until playback completes. The backend is
//! selected once at startup from configuration; an unsupported platform is a
//! fatal startup error, not something discovered mid-pipeline.

use crate::config::{SpeechBackendKind, SpeechConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("no speech backend available for platform {0:?}")]
    UnsupportedPlatform(&'static str),
    #[error("speech backend 'command' requires speech.command to be set")]
    MissingCommand,
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// Renders text as speech, blocking until playback completes.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn speak(&self, text: &str) -> Result<()>;
}

/// A backend that pipes text through an external command's argument list.
///
/// Covers all supported platforms: `say` on macOS, `espeak`/`espeak-ng` on
/// Linux, and arbitrary user-configured commands.
pub struct CommandBackend {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl SpeechBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn speak(&self, text: &str) -> Result<()> {
        debug!(backend = %self.name, text = %text, "Speaking");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .status()
            .await
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(SpeechError::Failed {
                program: self.program.clone(),
                status,
            }
            .into());
        }
        Ok(())
    }
}

/// Builds the configured speech backend.
///
/// `auto` picks the compile-target default. Failure here is fatal: the
/// announcer refuses to start without a working backend.
pub fn backend_from_config(config: &SpeechConfig) -> Result<Arc<dyn SpeechBackend>, SpeechError> {
    let backend: Arc<dyn SpeechBackend> = match config.backend {
        SpeechBackendKind::Auto => default_for_target(config)?,
        SpeechBackendKind::Say => Arc::new(say_backend(config)),
        SpeechBackendKind::Espeak => Arc::new(CommandBackend::new("espeak", "espeak-ng", vec![])),
        SpeechBackendKind::Command => {
            let mut argv = config.command.iter();
            let program = argv.next().ok_or(SpeechError::MissingCommand)?;
            Arc::new(CommandBackend::new(
                "command",
                program.as_str(),
                argv.cloned().collect(),
            ))
        }
    };
    info!(backend = backend.name(), "Speech backend selected");
    Ok(backend)
}

fn default_for_target(config: &SpeechConfig) -> Result<Arc<dyn SpeechBackend>, SpeechError> {
    if cfg!(target_os = "macos") {
        Ok(Arc::new(say_backend(config)))
    } else if cfg!(target_os = "linux") {
        Ok(Arc::new(CommandBackend::new("espeak", "espeak-ng", vec![])))
    } else {
        Err(SpeechError::UnsupportedPlatform(std::env::consts::OS))
    }
}

fn say_backend(config: &SpeechConfig) -> CommandBackend {
    let args = match &config.voice {
        Some(voice) => vec!["-v".to_string(), voice.clone()],
        None => vec![],
    };
    CommandBackend::new("say", "say", args)
}
