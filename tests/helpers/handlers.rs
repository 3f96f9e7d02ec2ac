#![allow(dead_code)]
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use iriswear::core::{BusPublisher, Handler, Notification};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::{Notify, Semaphore};

/// A handler that counts the notifications it has received.
#[derive(Clone)]
pub struct CountingHandler {
    pub count: Arc<AtomicUsize>,
    pub notifier: Arc<Notify>,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            notifier: Arc::new(Notify::new()),
        }
    }

    pub async fn wait_for_count(&self, target: usize, timeout: std::time::Duration) {
        let wait = async {
            while self.count.load(Ordering::SeqCst) < target {
                self.notifier.notified().await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .expect("Timed out waiting for notifications");
    }
}

#[async_trait]
impl Handler for CountingHandler {
    fn name(&self) -> &str {
        "counting_mock"
    }

    async fn deliver(&self, _notification: &Notification) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.notifier.notify_one();
        Ok(())
    }
}

/// A handler that records each delivered message under its own name.
pub struct RecordingHandler {
    pub name: &'static str,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push(notification.message.clone());
        Ok(())
    }
}

/// A handler that always fails, counting its invocations.
pub struct FailingHandler {
    pub attempts: Arc<AtomicUsize>,
}

impl FailingHandler {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Handler for FailingHandler {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn deliver(&self, _notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("simulated handler failure"))
    }
}

/// A handler that blocks inside `deliver` until explicitly released, so
/// tests can signal shutdown while a record is mid-fan-out.
pub struct GatedHandler {
    pub entered: Arc<AtomicUsize>,
    pub release: Arc<Semaphore>,
}

impl GatedHandler {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(AtomicUsize::new(0)),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    pub async fn wait_until_entered(&self, timeout: std::time::Duration) {
        let wait = async {
            while self.entered.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .expect("Timed out waiting for the gated handler to start");
    }
}

#[async_trait]
impl Handler for GatedHandler {
    fn name(&self) -> &str {
        "gated_mock"
    }

    async fn deliver(&self, _notification: &Notification) -> Result<()> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let permit = self.release.acquire().await?;
        permit.forget();
        Ok(())
    }
}

/// A publisher that records every publish instead of touching a bus.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl BusPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}
