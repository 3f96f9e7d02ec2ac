//! A handler that logs every delivered notification.
//!
//! Useful on its own for debugging, and as the notifier's record of what
//! flowed through the pipeline regardless of what the other handlers did.

use crate::core::{Handler, Notification};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

pub struct LogHandler;

#[async_trait]
impl Handler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            message = %notification.message,
            title = ?notification.title,
            priority = notification.priority,
            extra = ?notification.extra,
            "Notification"
        );
        Ok(())
    }
}
