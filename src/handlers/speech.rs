//! The announcer's speech handler.

use crate::core::{Handler, Notification};
use crate::speech::SpeechBackend;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Renders each notification's message as speech.
///
/// `speak` blocks the drain loop until playback completes. That is the
/// point: the announcer serializes speech output so announcements are never
/// overlapped or interleaved.
pub struct SpeechHandler {
    backend: Arc<dyn SpeechBackend>,
}

impl SpeechHandler {
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Handler for SpeechHandler {
    fn name(&self) -> &str {
        "speech"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if let Some(tone) = notification.extra.get("tone") {
            // TODO: play a tone before speaking. The wire format already
            // carries the field; it has no effect yet.
            debug!(tone = %tone, "Tone requested, tones are not implemented");
        }

        self.backend.speak(&notification.message).await
    }
}
