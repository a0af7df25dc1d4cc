//! # Switch Control Channel
//!
//! Typed boundary between the balancer and the switch transport. The
//! transport (connection handshake, framing, wire encoding) lives outside
//! this crate; it delivers [`SwitchEvent`]s and accepts
//! [`ControllerMessage`]s through a [`SwitchConnection`].
//!
//! Message shapes follow OpenFlow 1.0: flow-mods with a twelve-tuple match
//! and an ordered action list, packet-outs, and port statistics requests.

mod connection;
mod event;
mod message;

pub use connection::{ChannelConnection, SwitchConnection, TransportError, TransportResult};
pub use event::{ConnectionId, PacketIn, PortStats, SwitchEvent};
pub use message::{
    ControllerMessage, FlowAction, FlowMatch, FlowMod, OutputPort, PacketOut, PendingPacket,
    PortStatsRequest,
};
