//! ARP for Ethernet/IPv4 (RFC 826).
//!
//! ```text
//! +-------------------------------+-------------------------------+
//! |         Hardware Type         |         Protocol Type         |
//! +---------------+---------------+-------------------------------+
//! |     HLen      |     PLen      |           Operation           |
//! +---------------+---------------+-------------------------------+
//! |            Sender Hardware / Protocol Address (6 + 4)         |
//! +---------------------------------------------------------------+
//! |            Target Hardware / Protocol Address (6 + 4)         |
//! +---------------------------------------------------------------+
//! ```

use super::{ensure_len, MacAddr, PacketError, PacketResult};
use smoltcp::wire;
use std::net::Ipv4Addr;

/// Length of an Ethernet/IPv4 ARP packet.
pub const ARP_PACKET_LEN: usize = 28;

/// ARP operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    /// Who-has.
    Request,
    /// Is-at.
    Reply,
    /// Any other opcode (RARP, InARP, ...).
    Other(u16),
}

impl ArpOperation {
    /// Converts from the wire opcode.
    #[must_use]
    pub fn from_raw(op: u16) -> Self {
        match op {
            1 => Self::Request,
            2 => Self::Reply,
            other => Self::Other(other),
        }
    }

    /// Converts to the wire opcode.
    #[must_use]
    pub fn to_raw(self) -> u16 {
        match self {
            Self::Request => 1,
            Self::Reply => 2,
            Self::Other(op) => op,
        }
    }
}

/// An Ethernet/IPv4 ARP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    /// Operation code.
    pub operation: ArpOperation,
    /// Sender hardware address.
    pub sender_hw: MacAddr,
    /// Sender protocol address.
    pub sender_proto: Ipv4Addr,
    /// Target hardware address.
    pub target_hw: MacAddr,
    /// Target protocol address.
    pub target_proto: Ipv4Addr,
}

impl ArpPacket {
    /// Parses an ARP packet. Only Ethernet/IPv4 address formats are accepted.
    ///
    /// # Errors
    ///
    /// Returns `PacketError::Truncated` for short buffers and
    /// `PacketError::Invalid` for other hardware/protocol formats.
    pub fn parse(buf: &[u8]) -> PacketResult<Self> {
        ensure_len(buf, ARP_PACKET_LEN, "arp packet")?;

        let packet = wire::ArpPacket::new_unchecked(buf);
        let repr =
            wire::ArpRepr::parse(&packet).map_err(|_| PacketError::Invalid("arp address format"))?;
        let wire::ArpRepr::EthernetIpv4 {
            operation,
            source_hardware_addr,
            source_protocol_addr,
            target_hardware_addr,
            target_protocol_addr,
        } = repr
        else {
            return Err(PacketError::Invalid("arp address format"));
        };

        Ok(Self {
            operation: ArpOperation::from_raw(operation.into()),
            sender_hw: source_hardware_addr.into(),
            sender_proto: source_protocol_addr,
            target_hw: target_hardware_addr.into(),
            target_proto: target_protocol_addr,
        })
    }

    /// Serializes the packet to its 28-byte wire form.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let repr = wire::ArpRepr::EthernetIpv4 {
            operation: wire::ArpOperation::from(self.operation.to_raw()),
            source_hardware_addr: self.sender_hw.into(),
            source_protocol_addr: self.sender_proto,
            target_hardware_addr: self.target_hw.into(),
            target_protocol_addr: self.target_proto,
        };

        let mut out = vec![0u8; repr.buffer_len()];
        repr.emit(&mut wire::ArpPacket::new_unchecked(&mut out[..]));
        out
    }
}
