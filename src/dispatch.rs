//! The drain loop and handler fan-out.
//!
//! One dispatcher task is the sole consumer of a pipeline's queue and the
//! sole invoker of its handlers, so handlers never execute concurrently with
//! each other or with themselves. Handler failures are isolated: an error is
//! logged with the handler's name and delivery proceeds to the next handler.

use crate::core::{Handler, Notification};
use crate::queue::NotificationQueue;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// An ordered list of handlers invoked for every dequeued notification.
///
/// Handlers are registered once at startup; there is no dynamic add/remove
/// during steady-state operation.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. Invocation order is registration order.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        debug!(handler = handler.name(), "Registering handler");
        self.handlers.push(handler);
    }

    /// Fans one notification out to every handler, in order.
    ///
    /// A failing handler never skips, retries, or aborts delivery to the
    /// handlers after it.
    pub async fn dispatch(&self, notification: &Notification) {
        for handler in &self.handlers {
            if let Err(error) = handler.deliver(notification).await {
                error!(
                    handler = handler.name(),
                    error = %error,
                    "Handler failed, continuing with remaining handlers"
                );
                metrics::counter!("handler_failures", "handler" => handler.name().to_string())
                    .increment(1);
            }
        }
        metrics::counter!("notifications_dispatched").increment(1);
    }
}

/// The single-consumer drain loop of one pipeline.
pub struct Dispatcher {
    queue: Arc<NotificationQueue>,
    registry: HandlerRegistry,
    shutdown_rx: watch::Receiver<bool>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<NotificationQueue>,
        registry: HandlerRegistry,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            registry,
            shutdown_rx,
        }
    }

    /// Runs until shutdown is signalled.
    ///
    /// Shutdown is cooperative: it is observed between records, never
    /// mid-fan-out, so the in-flight notification always reaches every
    /// remaining handler before the loop exits. No record is dequeued after
    /// shutdown is observed.
    pub async fn run(mut self) {
        info!("Dispatcher started");
        loop {
            let notification = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => {
                    info!("Dispatcher received shutdown signal");
                    break;
                }
                notification = self.queue.pop() => notification,
            };

            debug!(
                message = %notification.message,
                priority = notification.priority,
                "Dispatching notification"
            );
            self.registry.dispatch(&notification).await;
        }
        info!("Dispatcher stopped");
    }
}
