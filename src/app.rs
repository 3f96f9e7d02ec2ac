//! Pipeline assembly, decoupled from the entry point.
//!
//! Both subcommands share one engine: a bus subscription feeding the
//! normalizer, the FIFO queue, and a dispatcher fanning out to handlers.
//! They differ only in which topic they subscribe and which handlers they
//! register.

use crate::{
    bus::{BusClient, Subscription},
    config::Config,
    core::BusPublisher,
    dispatch::{Dispatcher, HandlerRegistry},
    handlers::{LogHandler, ReannounceHandler, SpeechHandler},
    normalize::normalize,
    queue::NotificationQueue,
    speech,
    task_manager::TaskManager,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

const INGEST_CAPACITY: usize = 64;

/// A handle to a running pipeline and its tasks.
pub struct App {
    task_manager: TaskManager,
}

impl App {
    /// Assembles the announcer: announce topic → speech handler.
    ///
    /// Fails fast when no speech backend is available; the drain loop is
    /// never started in that case.
    pub fn announcer(config: &Config, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let backend = speech::backend_from_config(&config.speech)?;

        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(SpeechHandler::new(backend)));

        let app = Self::assemble(
            config,
            config.bus.announce_topic.clone(),
            registry,
            shutdown_rx,
        );
        info!(topic = %config.bus.announce_topic, "Announcer pipeline assembled");
        Ok(app)
    }

    /// Assembles the notifier: notify topic → log + re-announce handlers.
    pub fn notifier(config: &Config, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let queue = Arc::new(NotificationQueue::new());
        let (payload_tx, payload_rx) = mpsc::channel(INGEST_CAPACITY);

        let (bus_client, bus_handle) = BusClient::new(
            config.bus.url.clone(),
            vec![Subscription::new(config.bus.notify_topic.clone(), payload_tx)],
        );
        let publisher: Arc<dyn BusPublisher> = Arc::new(bus_handle);

        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(LogHandler));
        registry.register(Arc::new(ReannounceHandler::new(
            publisher,
            config.bus.announce_topic.clone(),
            config.notify.announce_priority,
        )));

        let app = Self::spawn_pipeline(bus_client, payload_rx, queue, registry, shutdown_rx);
        info!(
            topic = %config.bus.notify_topic,
            announce_priority = config.notify.announce_priority,
            "Notifier pipeline assembled"
        );
        Ok(app)
    }

    /// Shared wiring for pipelines that do not publish back to the bus.
    fn assemble(
        config: &Config,
        topic: String,
        registry: HandlerRegistry,
        shutdown_rx: watch::Receiver<bool>,
    ) -> App {
        let queue = Arc::new(NotificationQueue::new());
        let (payload_tx, payload_rx) = mpsc::channel(INGEST_CAPACITY);
        let (bus_client, _bus_handle) =
            BusClient::new(config.bus.url.clone(), vec![Subscription::new(topic, payload_tx)]);
        Self::spawn_pipeline(bus_client, payload_rx, queue, registry, shutdown_rx)
    }

    fn spawn_pipeline(
        bus_client: BusClient,
        payload_rx: mpsc::Receiver<Vec<u8>>,
        queue: Arc<NotificationQueue>,
        registry: HandlerRegistry,
        shutdown_rx: watch::Receiver<bool>,
    ) -> App {
        let task_manager = TaskManager::new(shutdown_rx);

        task_manager.spawn(
            "BusClient",
            bus_client.run(task_manager.shutdown_rx()),
        );
        task_manager.spawn(
            "Ingest",
            run_ingest(payload_rx, queue.clone(), task_manager.shutdown_rx()),
        );
        task_manager.spawn(
            "Dispatcher",
            Dispatcher::new(queue, registry, task_manager.shutdown_rx()).run(),
        );

        App { task_manager }
    }

    /// Waits for the shutdown signal, then joins every task.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.shutdown_rx();
        shutdown_rx.changed().await.ok();
        info!("Shutdown signal received, draining tasks");
        self.task_manager.shutdown().await;
        info!("All tasks shut down");
        Ok(())
    }
}

/// Feeds bus payloads through the normalizer into the queue.
async fn run_ingest(
    mut payload_rx: mpsc::Receiver<Vec<u8>>,
    queue: Arc<NotificationQueue>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let payload = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            payload = payload_rx.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        if let Some(notification) = normalize(&payload) {
            queue.push(notification);
        }
    }
    info!("Ingest task stopped");
}
