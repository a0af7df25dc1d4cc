//! Events delivered by the switch transport.

use super::connection::SwitchConnection;
use super::message::PendingPacket;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies one switch connection (the switch datapath id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A packet the switch could not match against its flow table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    /// Raw frame bytes.
    pub data: Bytes,
    /// Port the frame arrived on.
    pub in_port: u16,
    /// Switch buffer holding the frame, if buffered.
    pub buffer_id: Option<u32>,
}

impl PacketIn {
    /// Creates an unbuffered packet-in.
    #[must_use]
    pub fn new(data: impl Into<Bytes>, in_port: u16) -> Self {
        Self {
            data: data.into(),
            in_port,
            buffer_id: None,
        }
    }

    /// Sets the switch buffer id.
    #[must_use]
    pub fn with_buffer_id(mut self, buffer_id: u32) -> Self {
        self.buffer_id = Some(buffer_id);
        self
    }

    /// Reference the switch needs to push this packet through a new rule.
    #[must_use]
    pub fn pending_packet(&self) -> PendingPacket {
        match self.buffer_id {
            Some(buffer_id) => PendingPacket::Buffered {
                buffer_id,
                in_port: self.in_port,
            },
            None => PendingPacket::Unbuffered {
                data: self.data.clone(),
                in_port: self.in_port,
            },
        }
    }
}

/// Counters for one switch port, as reported in a port statistics reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStats {
    /// Port number.
    pub port_no: u16,
    /// Received packets.
    pub rx_packets: u64,
    /// Transmitted packets.
    pub tx_packets: u64,
    /// Received bytes.
    pub rx_bytes: u64,
    /// Transmitted bytes.
    pub tx_bytes: u64,
    /// Packets dropped on receive.
    pub rx_dropped: u64,
    /// Packets dropped on transmit.
    pub tx_dropped: u64,
    /// Receive errors.
    pub rx_errors: u64,
    /// Transmit errors.
    pub tx_errors: u64,
}

/// Events delivered to the controller, in per-connection order.
#[derive(Clone)]
pub enum SwitchEvent {
    /// A switch finished its handshake.
    ConnectionUp {
        /// Connection id.
        connection: ConnectionId,
        /// Handle used to send messages to the switch.
        handle: Arc<dyn SwitchConnection>,
    },
    /// A switch disconnected.
    ConnectionDown {
        /// Connection id.
        connection: ConnectionId,
    },
    /// A packet was sent to the controller.
    PacketIn {
        /// Connection id.
        connection: ConnectionId,
        /// The packet.
        packet: PacketIn,
    },
    /// A port statistics reply arrived.
    PortStatsReceived {
        /// Connection id.
        connection: ConnectionId,
        /// Per-port counters.
        stats: Vec<PortStats>,
    },
}

impl SwitchEvent {
    /// Connection the event belongs to.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        match self {
            Self::ConnectionUp { connection, .. }
            | Self::ConnectionDown { connection }
            | Self::PacketIn { connection, .. }
            | Self::PortStatsReceived { connection, .. } => *connection,
        }
    }
}

impl fmt::Debug for SwitchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionUp { connection, .. } => f
                .debug_struct("ConnectionUp")
                .field("connection", connection)
                .finish_non_exhaustive(),
            Self::ConnectionDown { connection } => f
                .debug_struct("ConnectionDown")
                .field("connection", connection)
                .finish(),
            Self::PacketIn { connection, packet } => f
                .debug_struct("PacketIn")
                .field("connection", connection)
                .field("in_port", &packet.in_port)
                .field("len", &packet.data.len())
                .finish(),
            Self::PortStatsReceived { connection, stats } => f
                .debug_struct("PortStatsReceived")
                .field("connection", connection)
                .field("ports", &stats.len())
                .finish(),
        }
    }
}
