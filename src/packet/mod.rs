//! # Packet Codec
//!
//! Minimal Ethernet/ARP/IPv4 parsing and serialization used by the
//! controller, built on `smoltcp::wire`. Only the header fields the balancer
//! inspects or rewrites are decoded; everything else is carried through as
//! raw bytes.
//!
//! ```text
//! ┌──────────────┬──────────────┬───────────┬──────────────────────┐
//! │ dst (6)      │ src (6)      │ type (2)  │ ARP (28) | IPv4 ...  │
//! └──────────────┴──────────────┴───────────┴──────────────────────┘
//! ```

pub mod arp;
pub mod ethernet;
pub mod ipv4;

pub use arp::{ArpOperation, ArpPacket};
pub use ethernet::{EtherType, EthernetFrame};
pub use ipv4::Ipv4Header;

use smoltcp::wire::EthernetAddress;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while decoding or rewriting frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Buffer is shorter than the header being decoded.
    #[error("truncated {what}: need {needed} bytes, got {actual}")]
    Truncated {
        /// Header being decoded.
        what: &'static str,
        /// Minimum number of bytes required.
        needed: usize,
        /// Number of bytes available.
        actual: usize,
    },

    /// Header contents are malformed.
    #[error("invalid {0}")]
    Invalid(&'static str),

    /// Textual hardware address could not be parsed.
    #[error("invalid hardware address '{0}'")]
    InvalidMacAddr(String),
}

/// Result type for codec operations.
pub type PacketResult<T> = Result<T, PacketError>;

pub(crate) fn ensure_len(buf: &[u8], needed: usize, what: &'static str) -> PacketResult<()> {
    if buf.len() < needed {
        return Err(PacketError::Truncated {
            what,
            needed,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// A 48-bit IEEE 802 hardware address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// The broadcast address `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// The all-zero address.
    pub const ZERO: Self = Self([0; 6]);

    /// Builds an address from a five-octet prefix and a final octet.
    #[must_use]
    pub const fn from_prefix(prefix: [u8; 5], last: u8) -> Self {
        Self([prefix[0], prefix[1], prefix[2], prefix[3], prefix[4], last])
    }

    /// Returns the raw octets.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<EthernetAddress> for MacAddr {
    fn from(addr: EthernetAddress) -> Self {
        Self(addr.0)
    }
}

impl From<MacAddr> for EthernetAddress {
    fn from(mac: MacAddr) -> Self {
        EthernetAddress(mac.0)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for MacAddr {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| PacketError::InvalidMacAddr(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| PacketError::InvalidMacAddr(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(PacketError::InvalidMacAddr(s.to_string()));
        }
        Ok(Self(octets))
    }
}

/// Payload of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// Address resolution packet.
    Arp(ArpPacket),
    /// IPv4 datagram (header only).
    Ipv4(Ipv4Header),
    /// Any other ether-type; left undecoded.
    Other(u16),
}

/// A decoded frame: link-layer addressing plus the typed payload header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Destination link address.
    pub dst: MacAddr,
    /// Source link address.
    pub src: MacAddr,
    /// Ether-type of the payload.
    pub ethertype: u16,
    /// Decoded payload header.
    pub payload: Payload,
}

impl Frame {
    /// Decodes an Ethernet frame and, for ARP and IPv4, its payload header.
    ///
    /// # Errors
    ///
    /// Returns a [`PacketError`] if the Ethernet header or the ARP/IPv4
    /// header that follows it is truncated or malformed.
    pub fn parse(buf: &[u8]) -> PacketResult<Self> {
        let eth = EthernetFrame::parse(buf)?;
        let payload = match eth.ethertype {
            EtherType::ARP => Payload::Arp(ArpPacket::parse(eth.payload)?),
            EtherType::IPV4 => Payload::Ipv4(Ipv4Header::parse(eth.payload)?),
            other => Payload::Other(other),
        };
        Ok(Self {
            dst: eth.dst,
            src: eth.src,
            ethertype: eth.ethertype,
            payload,
        })
    }
}
