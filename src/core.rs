//! Core domain types and service traits for Iriswear
//!
//! This module defines the canonical notification record and the trait
//! contracts that govern component interactions throughout the dispatcher.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The canonical notification record flowing through a pipeline.
///
/// Every wire shape accepted by the normalizer collapses into this structure.
/// Once constructed it is immutable; handlers receive a shared reference, so
/// no handler can affect another handler's view of the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Notification {
    /// The primary human-readable content. Never empty once enqueued.
    pub message: String,
    /// Optional title, prefixed to the message by the re-announce handler.
    pub title: Option<String>,
    /// Advisory priority, compared against a configured threshold by the
    /// re-announce handler. Never used to reorder the queue.
    pub priority: i64,
    /// All payload keys not recognized as message/title/priority, passed
    /// through verbatim to handlers.
    pub extra: Map<String, Value>,
}

impl Notification {
    /// Creates a notification carrying only a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// An independently-failing action taken per notification.
///
/// Handlers are invoked in registration order by the drain loop, one record
/// at a time. A handler error is logged and isolated; it never affects
/// delivery to the remaining handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// A unique, descriptive name for the handler (e.g., "speech",
    /// "announce"). Used for logging and metrics.
    fn name(&self) -> &str;

    /// Delivers one notification to this handler's destination.
    ///
    /// # Returns
    /// * `Ok(())` if the notification was handled
    /// * `Err` if handling failed; the failure is isolated to this handler
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Publishes outgoing messages on the bus, on behalf of handlers.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    /// Publishes a payload to a topic. The payload is raw UTF-8 text.
    async fn publish(&self, topic: &str, payload: String) -> Result<()>;
}
