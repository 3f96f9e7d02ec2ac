//! The notifier's re-announce handler.

use crate::core::{BusPublisher, Handler, Notification};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Re-publishes qualifying notifications to the announce topic.
///
/// This is a policy gate, not a queue filter: a notification below the
/// priority threshold was still fully delivered to every other handler; this
/// handler just declines to announce it.
pub struct ReannounceHandler {
    publisher: Arc<dyn BusPublisher>,
    announce_topic: String,
    priority_threshold: i64,
}

impl ReannounceHandler {
    pub fn new(
        publisher: Arc<dyn BusPublisher>,
        announce_topic: impl Into<String>,
        priority_threshold: i64,
    ) -> Self {
        Self {
            publisher,
            announce_topic: announce_topic.into(),
            priority_threshold,
        }
    }
}

/// Composes the announcement text, prefixing the title when present.
pub fn compose(title: Option<&str>, message: &str) -> String {
    match title {
        Some(title) => format!("{title} - {message}"),
        None => message.to_string(),
    }
}

#[async_trait]
impl Handler for ReannounceHandler {
    fn name(&self) -> &str {
        "announce"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if notification.priority < self.priority_threshold {
            debug!(
                priority = notification.priority,
                threshold = self.priority_threshold,
                "Notification below announce threshold"
            );
            return Ok(());
        }

        let text = compose(notification.title.as_deref(), &notification.message);
        self.publisher.publish(&self.announce_topic, text).await?;
        metrics::counter!("announcements_published").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String)>>,
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

    fn notification(message: &str, title: Option<&str>, priority: i64) -> Notification {
        Notification {
            message: message.to_string(),
            title: title.map(str::to_string),
            priority,
            ..Default::default()
        }
    }

    #[test]
    fn compose_prefixes_title_with_separator() {
        assert_eq!(compose(Some("Alert"), "disk full"), "Alert - disk full");
        assert_eq!(compose(None, "disk full"), "disk full");
    }

    #[tokio::test]
    async fn below_threshold_never_publishes() {
        let publisher = Arc::new(RecordingPublisher::default());
        let handler = ReannounceHandler::new(publisher.clone(), "/iriswear/announce", 5);

        handler
            .deliver(&notification("quiet", None, 3))
            .await
            .unwrap();

        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn at_threshold_publishes_to_announce_topic() {
        let publisher = Arc::new(RecordingPublisher::default());
        let handler = ReannounceHandler::new(publisher.clone(), "/iriswear/announce", 5);

        handler
            .deliver(&notification("disk full", Some("Alert"), 5))
            .await
            .unwrap();

        assert_eq!(
            *publisher.published.lock().unwrap(),
            vec![(
                "/iriswear/announce".to_string(),
                "Alert - disk full".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn zero_threshold_announces_everything() {
        let publisher = Arc::new(RecordingPublisher::default());
        let handler = ReannounceHandler::new(publisher.clone(), "/iriswear/announce", 0);

        handler
            .deliver(&notification("hello", None, 0))
            .await
            .unwrap();

        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }
}
