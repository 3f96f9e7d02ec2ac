#![allow(dead_code)]
use async_trait::async_trait;
use iriswear::bus::{BusConnection, BusError, Frame};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A scripted [`BusConnection`] for driving the bus client without a socket.
///
/// Inbound items are played back in order; once exhausted the connection
/// either stays open forever (so outgoing traffic can be observed) or
/// reports closure. Every frame the client sends is recorded.
pub struct ScriptedConnection {
    inbound: VecDeque<Result<Frame, BusError>>,
    hold_open: bool,
    sent: Arc<Mutex<Vec<Frame>>>,
}

impl ScriptedConnection {
    pub fn new(inbound: Vec<Result<Frame, BusError>>, hold_open: bool) -> Self {
        Self {
            inbound: inbound.into(),
            hold_open,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the frames the client has written.
    pub fn sent(&self) -> Arc<Mutex<Vec<Frame>>> {
        self.sent.clone()
    }
}

#[async_trait]
impl BusConnection for ScriptedConnection {
    async fn send(&mut self, frame: Frame) -> Result<(), BusError> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Frame, BusError>> {
        match self.inbound.pop_front() {
            Some(item) => Some(item),
            None if self.hold_open => futures::future::pending().await,
            None => None,
        }
    }
}

/// Builds a framing error of the kind a garbled wire frame produces.
pub fn frame_error() -> BusError {
    let error = serde_json::from_str::<Frame>("not json").unwrap_err();
    BusError::Frame(error)
}
