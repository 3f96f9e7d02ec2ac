//! Manages the lifecycle of all spawned tasks in the application.

use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A centralized manager for the pipeline's spawned tasks.
///
/// Tracks every `JoinHandle` so shutdown can await them all, and hands out
/// clones of the shutdown receiver so each task observes the same signal.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns a task and records its handle.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.handles
            .lock()
            .expect("task manager poisoned")
            .push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Awaits every managed task.
    pub async fn shutdown(self) {
        let handles: Vec<_> = self
            .handles
            .lock()
            .expect("task manager poisoned")
            .drain(..)
            .collect();
        info!("Waiting for {} tasks to complete", handles.len());

        let names: Vec<&'static str> = handles.iter().map(|(name, _)| *name).collect();
        let results = join_all(handles.into_iter().map(|(_, handle)| handle)).await;

        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task = name, "Task shut down gracefully"),
                Err(error) => error!(task = name, %error, "Task panicked during shutdown"),
            }
        }
    }
}
