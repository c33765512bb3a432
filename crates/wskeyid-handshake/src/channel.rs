//! Framed message channel port.
//!
//! The handshake runs over anything that moves whole frames in both
//! directions. A closed or broken connection is a [`TransportError`]; the
//! handshake never tries to send protocol messages over it afterwards.

use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// A single frame on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
}

impl Frame {
    /// Payload bytes of a data frame; `None` for control frames.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Text(text) => Some(text.as_bytes()),
            Self::Binary(bytes) => Some(bytes.as_slice()),
            Self::Ping(_) | Self::Pong(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }
}

/// Bidirectional framed connection.
pub trait FrameChannel: Send {
    /// Wait for the next inbound frame.
    fn recv(&mut self) -> impl Future<Output = Result<Frame, TransportError>> + Send;

    /// Send one frame.
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// One end of an in-process channel pair.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryChannel {
    /// Create two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self { tx: a_tx, rx: b_rx }, Self { tx: b_tx, rx: a_rx })
    }

    /// Send a text frame.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send(Frame::Text(text.into())).await
    }
}

impl FrameChannel for MemoryChannel {
    async fn recv(&mut self) -> Result<Frame, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}
