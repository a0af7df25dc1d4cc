//! Balancer error types.

use crate::openflow::{ConnectionId, TransportError};
use crate::packet::PacketError;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Errors that can occur in the balancer core.
#[derive(Debug, Error)]
pub enum BalancerError {
    /// Invalid host layout or timing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A frame could not be decoded or rewritten.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// A message could not be handed to the switch transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No registered client owns the network address.
    #[error("no client registered for {0}")]
    UnknownClient(Ipv4Addr),

    /// The host has no switch port to forward to.
    #[error("host {0} has no attachment port")]
    NoAttachmentPort(Ipv4Addr),

    /// No live session for the connection.
    #[error("no session for connection {0}")]
    SessionNotFound(ConnectionId),

    /// The controller or session is not accepting events.
    #[error("balancer not running")]
    NotRunning,
}

/// Result type for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;
