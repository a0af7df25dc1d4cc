//! Ethernet II framing.

use super::{ensure_len, MacAddr, PacketResult};
use smoltcp::wire;

/// Ether-type constants.
pub struct EtherType;

impl EtherType {
    /// IPv4.
    pub const IPV4: u16 = 0x0800;
    /// Address Resolution Protocol.
    pub const ARP: u16 = 0x0806;
}

/// Borrowed view of an Ethernet II frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFrame<'a> {
    /// Destination link address.
    pub dst: MacAddr,
    /// Source link address.
    pub src: MacAddr,
    /// Payload ether-type.
    pub ethertype: u16,
    /// Bytes following the header.
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// Length of the untagged Ethernet header.
    pub const HEADER_LEN: usize = 14;

    /// Parses the header of `buf`.
    ///
    /// # Errors
    ///
    /// Returns `PacketError::Truncated` if `buf` is shorter than a header.
    pub fn parse(buf: &'a [u8]) -> PacketResult<Self> {
        ensure_len(buf, Self::HEADER_LEN, "ethernet header")?;
        let frame = wire::EthernetFrame::new_unchecked(buf);
        Ok(Self {
            dst: frame.dst_addr().into(),
            src: frame.src_addr().into(),
            ethertype: frame.ethertype().into(),
            payload: frame.payload(),
        })
    }

    /// Builds a frame around `payload`.
    #[must_use]
    pub fn serialize(dst: MacAddr, src: MacAddr, ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let repr = wire::EthernetRepr {
            src_addr: src.into(),
            dst_addr: dst.into(),
            ethertype: ethertype.into(),
        };

        let mut out = vec![0u8; repr.buffer_len() + payload.len()];
        let mut frame = wire::EthernetFrame::new_unchecked(&mut out[..]);
        repr.emit(&mut frame);
        frame.payload_mut().copy_from_slice(payload);
        out
    }

    /// Overwrites the source and destination link addresses of a frame in place.
    ///
    /// # Errors
    ///
    /// Returns `PacketError::Truncated` if `buf` is shorter than a header.
    pub fn rewrite_addresses(buf: &mut [u8], src: MacAddr, dst: MacAddr) -> PacketResult<()> {
        ensure_len(buf, Self::HEADER_LEN, "ethernet header")?;
        let mut frame = wire::EthernetFrame::new_unchecked(buf);
        frame.set_src_addr(src.into());
        frame.set_dst_addr(dst.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let bytes = EthernetFrame::serialize(
            MacAddr([1, 2, 3, 4, 5, 6]),
            MacAddr([6, 5, 4, 3, 2, 1]),
            EtherType::IPV4,
            b"payload",
        );
        let frame = EthernetFrame::parse(&bytes).unwrap();
        assert_eq!(frame.dst, MacAddr([1, 2, 3, 4, 5, 6]));
        assert_eq!(frame.src, MacAddr([6, 5, 4, 3, 2, 1]));
        assert_eq!(frame.ethertype, EtherType::IPV4);
        assert_eq!(frame.payload, b"payload");
    }

    #[test]
    fn test_wire_layout() {
        let bytes = EthernetFrame::serialize(
            MacAddr([1, 2, 3, 4, 5, 6]),
            MacAddr([6, 5, 4, 3, 2, 1]),
            EtherType::ARP,
            &[0xaa],
        );
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6, 6, 5, 4, 3, 2, 1, 0x08, 0x06, 0xaa]);
    }

    #[test]
    fn test_parse_too_short() {
        assert!(EthernetFrame::parse(&[0u8; 13]).is_err());
    }

    #[test]
    fn test_rewrite_addresses_keeps_payload() {
        let mut bytes =
            EthernetFrame::serialize(MacAddr::ZERO, MacAddr::ZERO, EtherType::IPV4, &[9, 9, 9]);
        EthernetFrame::rewrite_addresses(
            &mut bytes,
            MacAddr([0, 0, 0, 0, 0, 0x13]),
            MacAddr([0, 0, 0, 0, 0, 0x03]),
        )
        .unwrap();

        let frame = EthernetFrame::parse(&bytes).unwrap();
        assert_eq!(frame.src, MacAddr([0, 0, 0, 0, 0, 0x13]));
        assert_eq!(frame.dst, MacAddr([0, 0, 0, 0, 0, 0x03]));
        assert_eq!(frame.payload, &[9, 9, 9]);
    }
}
