//! WebSocket bus client.
//!
//! The bus is a publish/subscribe transport carrying JSON frames over a
//! WebSocket connection. This module handles connecting to the broker,
//! (re-)establishing topic subscriptions, routing inbound messages to the
//! pipelines and draining outgoing publishes, plus reconnection with
//! exponential backoff. Everything above this module only sees raw payload
//! bytes per topic and the [`BusPublisher`] trait.

use crate::core::BusPublisher;
use anyhow::anyhow;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const OUTGOING_CAPACITY: usize = 64;

/// Errors surfaced by the bus transport.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed bus frame: {0}")]
    Frame(#[from] serde_json::Error),
}

/// A single frame on the wire.
///
/// `subscribe` is sent client-to-broker for every configured topic on each
/// (re)connect. `publish` flows both directions; the payload is the raw
/// UTF-8 text of the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Subscribe { topic: String },
    Publish { topic: String, payload: String },
}

/// A transport-level connection delivering bus frames.
///
/// Abstracted as a trait so tests can drive the client with a scripted
/// connection instead of a live socket.
#[async_trait]
pub trait BusConnection: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), BusError>;

    /// Reads the next frame.
    ///
    /// * `Some(Ok(frame))` on a frame
    /// * `Some(Err(_))` on a transport or framing error
    /// * `None` once the connection has closed
    async fn recv(&mut self) -> Option<Result<Frame, BusError>>;
}

/// The live WebSocket implementation of [`BusConnection`].
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl BusConnection for WsConnection {
    async fn send(&mut self, frame: Frame) -> Result<(), BusError> {
        let text = serde_json::to_string(&frame)?;
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Frame, BusError>> {
        while let Some(item) = self.stream.next().await {
            match item {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).map_err(BusError::from))
                }
                Ok(Message::Close(_)) => {
                    info!("Received close frame from bus");
                    return None;
                }
                Ok(_) => continue, // ping/pong/binary, nothing to route
                Err(error) => return Some(Err(error.into())),
            }
        }
        None
    }
}

/// A topic subscription: inbound payloads for `topic` are forwarded to `tx`.
pub struct Subscription {
    topic: String,
    tx: mpsc::Sender<Vec<u8>>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            tx,
        }
    }
}

/// A cloneable handle for publishing onto the bus.
///
/// Publishes are queued on a channel and written by the client task, so
/// handlers never touch the socket directly.
#[derive(Clone)]
pub struct BusHandle {
    outgoing_tx: mpsc::Sender<Frame>,
}

#[async_trait]
impl BusPublisher for BusHandle {
    async fn publish(&self, topic: &str, payload: String) -> anyhow::Result<()> {
        self.outgoing_tx
            .send(Frame::Publish {
                topic: topic.to_string(),
                payload,
            })
            .await
            .map_err(|_| anyhow!("bus client is not running"))
    }
}

/// The bus client task: owns the socket, reconnects with backoff, and routes
/// frames between the broker and the pipelines.
pub struct BusClient {
    url: String,
    subscriptions: Vec<Subscription>,
    outgoing_rx: mpsc::Receiver<Frame>,
    // Held so the outgoing channel never closes when all handles are dropped
    // (the announcer pipeline has no publishers at all).
    _outgoing_tx: mpsc::Sender<Frame>,
}

impl BusClient {
    /// Creates a client and its publish handle.
    pub fn new(url: impl Into<String>, subscriptions: Vec<Subscription>) -> (Self, BusHandle) {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_CAPACITY);
        let handle = BusHandle {
            outgoing_tx: outgoing_tx.clone(),
        };
        (
            Self {
                url: url.into(),
                subscriptions,
                outgoing_rx,
                _outgoing_tx: outgoing_tx,
            },
            handle,
        )
    }

    /// Runs the client with automatic reconnection until shutdown.
    ///
    /// Backoff starts at one second, doubles up to one minute with a little
    /// jitter, and resets after a successful connect.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            info!(url = %self.url, "Connecting to bus");
            match connect_async(&self.url).await {
                Ok((stream, _)) => {
                    info!(url = %self.url, "Connected to bus");
                    backoff = INITIAL_BACKOFF;
                    let mut connection = WsConnection { stream };
                    match self
                        .run_with_connection(&mut connection, &mut shutdown_rx)
                        .await
                    {
                        Ok(()) => info!("Bus connection closed"),
                        Err(error) => error!(error = %error, "Bus connection failed"),
                    }
                }
                Err(error) => {
                    error!(url = %self.url, error = %error, "Failed to connect to bus")
                }
            }

            if *shutdown_rx.borrow() {
                break;
            }

            let jitter = Duration::from_millis(rand::rng().random_range(0..250));
            let delay = backoff + jitter;
            info!(?delay, "Reconnecting to bus");
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        info!("Bus client stopped");
    }

    /// Drives one established connection until it closes, errors, or
    /// shutdown is signalled.
    ///
    /// Subscriptions are re-issued at the top of every call, which makes
    /// re-subscription on reconnect idempotent by construction.
    pub async fn run_with_connection(
        &mut self,
        connection: &mut dyn BusConnection,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), BusError> {
        for subscription in &self.subscriptions {
            debug!(topic = %subscription.topic, "Subscribing");
            connection
                .send(Frame::Subscribe {
                    topic: subscription.topic.clone(),
                })
                .await?;
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Bus connection received shutdown signal");
                    return Ok(());
                }
                outgoing = self.outgoing_rx.recv() => {
                    // recv never yields None: the client holds a sender.
                    if let Some(frame) = outgoing {
                        connection.send(frame).await?;
                    }
                }
                inbound = connection.recv() => match inbound {
                    Some(Ok(Frame::Publish { topic, payload })) => {
                        self.route(&topic, payload).await;
                    }
                    Some(Ok(Frame::Subscribe { topic })) => {
                        debug!(topic = %topic, "Ignoring subscribe frame from broker");
                    }
                    Some(Err(BusError::Frame(error))) => {
                        // A bad frame is the producer's problem, not ours.
                        warn!(error = %error, "Dropping malformed bus frame");
                    }
                    Some(Err(error)) => return Err(error),
                    None => return Ok(()),
                },
            }
        }
    }

    async fn route(&self, topic: &str, payload: String) {
        match self
            .subscriptions
            .iter()
            .find(|subscription| subscription.topic == topic)
        {
            Some(subscription) => {
                debug!(topic = %topic, bytes = payload.len(), "Bus message received");
                if subscription.tx.send(payload.into_bytes()).await.is_err() {
                    warn!(topic = %topic, "Ingest channel closed, dropping message");
                }
            }
            None => debug!(topic = %topic, "Ignoring message for unsubscribed topic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frames_serialize_to_tagged_json() {
        let frame = Frame::Subscribe {
            topic: "/iriswear/announce".to_string(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({ "type": "subscribe", "topic": "/iriswear/announce" })
        );

        let frame = Frame::Publish {
            topic: "/iriswear/notify".to_string(),
            payload: r#"{"message":"hi"}"#.to_string(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "publish",
                "topic": "/iriswear/notify",
                "payload": "{\"message\":\"hi\"}",
            })
        );
    }

    #[test]
    fn unknown_frame_type_is_a_frame_error() {
        let result: Result<Frame, _> =
            serde_json::from_str(r#"{"type":"unsubscribe","topic":"/t"}"#);
        assert!(result.is_err());
    }
}
