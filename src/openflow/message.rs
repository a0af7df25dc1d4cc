//! Controller-to-switch protocol messages.

use crate::packet::MacAddr;
use bytes::Bytes;
use std::fmt;
use std::net::Ipv4Addr;

/// Output port of a forward action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputPort {
    /// A physical switch port.
    Physical(u16),
    /// Send back out the port the packet arrived on (`OFPP_IN_PORT`).
    InPort,
}

impl OutputPort {
    /// `OFPP_IN_PORT` reserved port number.
    pub const OFPP_IN_PORT: u16 = 0xfff8;

    /// Wire port number.
    #[must_use]
    pub fn number(self) -> u16 {
        match self {
            Self::Physical(port) => port,
            Self::InPort => Self::OFPP_IN_PORT,
        }
    }
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical(port) => write!(f, "{port}"),
            Self::InPort => write!(f, "in_port"),
        }
    }
}

/// Match fields of a flow rule. `None` means wildcarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowMatch {
    /// Ingress port.
    pub in_port: Option<u16>,
    /// Ether-type.
    pub dl_type: Option<u16>,
    /// Source link address.
    pub dl_src: Option<MacAddr>,
    /// Destination link address.
    pub dl_dst: Option<MacAddr>,
    /// Source network address.
    pub nw_src: Option<Ipv4Addr>,
    /// Destination network address.
    pub nw_dst: Option<Ipv4Addr>,
}

/// A rewrite or forward action, applied in list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    /// Rewrite the source link address.
    SetDlSrc(MacAddr),
    /// Rewrite the destination link address.
    SetDlDst(MacAddr),
    /// Rewrite the source network address.
    SetNwSrc(Ipv4Addr),
    /// Rewrite the destination network address.
    SetNwDst(Ipv4Addr),
    /// Forward out a port.
    Output(OutputPort),
}

/// Packet the switch should push through a freshly installed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingPacket {
    /// Packet held in a switch buffer.
    Buffered {
        /// Switch buffer id from the packet-in.
        buffer_id: u32,
        /// Port the packet arrived on.
        in_port: u16,
    },
    /// Packet not buffered by the switch; carried inline.
    Unbuffered {
        /// Raw frame bytes.
        data: Bytes,
        /// Port the packet arrived on.
        in_port: u16,
    },
}

/// Flow-rule installation (`OFPT_FLOW_MOD`, command ADD).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    /// Match fields.
    pub matching: FlowMatch,
    /// Ordered action list.
    pub actions: Vec<FlowAction>,
    /// Idle timeout in seconds.
    pub idle_timeout: u16,
    /// Hard timeout in seconds.
    pub hard_timeout: u16,
    /// Packet to re-apply through the new rule, if any.
    pub packet: Option<PendingPacket>,
}

/// Packet injection (`OFPT_PACKET_OUT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    /// Raw frame bytes.
    pub data: Bytes,
    /// Port the packet is considered to have arrived on.
    pub in_port: Option<u16>,
    /// Ordered action list.
    pub actions: Vec<FlowAction>,
}

/// Port statistics request (`OFPST_PORT`) for every port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortStatsRequest {
    /// Port to query; `None` queries all ports (`OFPP_NONE`).
    pub port: Option<u16>,
}

/// Messages the controller sends to a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerMessage {
    /// Install a flow rule.
    FlowMod(FlowMod),
    /// Inject a packet.
    PacketOut(PacketOut),
    /// Ask for port counters.
    PortStatsRequest(PortStatsRequest),
}

impl ControllerMessage {
    /// Short message kind for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FlowMod(_) => "flow_mod",
            Self::PacketOut(_) => "packet_out",
            Self::PortStatsRequest(_) => "port_stats_request",
        }
    }

    /// Returns the flow-mod if this is one.
    #[must_use]
    pub fn as_flow_mod(&self) -> Option<&FlowMod> {
        match self {
            Self::FlowMod(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the packet-out if this is one.
    #[must_use]
    pub fn as_packet_out(&self) -> Option<&PacketOut> {
        match self {
            Self::PacketOut(m) => Some(m),
            _ => None,
        }
    }
}

impl From<FlowMod> for ControllerMessage {
    fn from(msg: FlowMod) -> Self {
        Self::FlowMod(msg)
    }
}

impl From<PacketOut> for ControllerMessage {
    fn from(msg: PacketOut) -> Self {
        Self::PacketOut(msg)
    }
}

impl From<PortStatsRequest> for ControllerMessage {
    fn from(msg: PortStatsRequest) -> Self {
        Self::PortStatsRequest(msg)
    }
}
