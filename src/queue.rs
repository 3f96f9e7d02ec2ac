//! The FIFO notification queue shared between bus ingest and the drain loop.
//!
//! Any number of producer tasks may push; a single consumer (the dispatcher)
//! pops. The queue is unbounded: expected load is human-triggered
//! announcements, so no backpressure signal is carried. An empty queue is an
//! expected, frequently-occurring state, not an error.

use crate::core::Notification;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// An unbounded, ordered queue of canonical notifications.
///
/// Consumers are woken by a [`Notify`] when a record arrives, so the drain
/// loop does not poll on a timer. Insertion order is delivery order.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    inner: Mutex<VecDeque<Notification>>,
    available: Notify,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a notification at the tail and wakes the consumer.
    pub fn push(&self, notification: Notification) {
        self.inner
            .lock()
            .expect("notification queue poisoned")
            .push_back(notification);
        metrics::counter!("notifications_enqueued").increment(1);
        self.available.notify_one();
    }

    /// Removes and returns the head, or `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<Notification> {
        self.inner
            .lock()
            .expect("notification queue poisoned")
            .pop_front()
    }

    /// Removes and returns the head, waiting for a push if the queue is
    /// empty. Cancel-safe: a record is only removed when this future
    /// completes.
    pub async fn pop(&self) -> Notification {
        loop {
            // Register interest before checking, so a push between the check
            // and the await cannot be missed.
            let notified = self.available.notified();
            if let Some(notification) = self.try_pop() {
                return notification;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("notification queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn pop_order_matches_push_order() {
        let queue = NotificationQueue::new();
        queue.push(Notification::from_message("a"));
        queue.push(Notification::from_message("b"));
        queue.push(Notification::from_message("c"));

        assert_eq!(queue.try_pop().unwrap().message, "a");
        assert_eq!(queue.try_pop().unwrap().message, "b");
        assert_eq!(queue.try_pop().unwrap().message, "c");
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn try_pop_on_empty_queue_is_none() {
        let queue = NotificationQueue::new();
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let queue = Arc::new(NotificationQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(Notification::from_message("late arrival"));

        let notification = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer timed out")
            .unwrap();
        assert_eq!(notification.message, "late arrival");
    }

    #[tokio::test]
    async fn pop_returns_immediately_when_nonempty() {
        let queue = NotificationQueue::new();
        queue.push(Notification::from_message("ready"));
        let notification = tokio::time::timeout(Duration::from_millis(100), queue.pop())
            .await
            .expect("pop should not wait");
        assert_eq!(notification.message, "ready");
    }

    #[tokio::test]
    async fn concurrent_producers_preserve_per_producer_order() {
        let queue = Arc::new(NotificationQueue::new());
        let mut producers = Vec::new();

        for producer in 0..4 {
            let queue = queue.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..25 {
                    queue.push(Notification::from_message(format!("{producer}:{i}")));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in producers {
            handle.await.unwrap();
        }

        assert_eq!(queue.len(), 100);
        let mut last_seen = [-1i32; 4];
        while let Some(notification) = queue.try_pop() {
            let (producer, i) = notification.message.split_once(':').unwrap();
            let producer: usize = producer.parse().unwrap();
            let i: i32 = i.parse().unwrap();
            assert!(
                i > last_seen[producer],
                "records from producer {producer} arrived out of order"
            );
            last_seen[producer] = i;
        }
    }
}
