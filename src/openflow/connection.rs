//! Sending side of a switch connection.

use super::message::ControllerMessage;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised when handing a message to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection is closed.
    #[error("switch connection closed")]
    Closed,
}

/// Result type for transport sends.
pub type TransportResult<T> = Result<T, TransportError>;

/// A handle for sending messages to one switch.
///
/// `send` must not block: it hands the message to the transport and returns.
/// Messages sent from one thread are delivered in call order.
pub trait SwitchConnection: Send + Sync + fmt::Debug {
    /// Queues a message for the switch.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the message cannot be queued.
    fn send(&self, message: ControllerMessage) -> TransportResult<()>;
}

/// A [`SwitchConnection`] backed by an unbounded Tokio channel.
///
/// The transport task owns the receiving half and writes messages to the
/// wire in the order they were queued.
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    tx: mpsc::UnboundedSender<ControllerMessage>,
}

impl ChannelConnection {
    /// Creates a connection and the receiver the transport drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControllerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns `true` once the transport dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl SwitchConnection for ChannelConnection {
    fn send(&self, message: ControllerMessage) -> TransportResult<()> {
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }
}
