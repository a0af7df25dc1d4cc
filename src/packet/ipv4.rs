//! IPv4 header decoding and in-place address rewriting.

use super::{ensure_len, PacketError, PacketResult};
use smoltcp::phy::ChecksumCapabilities;
use smoltcp::wire;
use std::net::Ipv4Addr;

/// Minimum IPv4 header length (no options).
pub const MIN_HEADER_LEN: usize = 20;

/// IP protocol number for ICMP.
pub const IPPROTO_ICMP: u8 = 1;

/// Decoded IPv4 header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Header length in bytes (IHL * 4).
    pub header_len: usize,
    /// Total datagram length from the header.
    pub total_len: u16,
    /// Time to live.
    pub ttl: u8,
    /// Transport protocol number.
    pub protocol: u8,
    /// Source network address.
    pub src: Ipv4Addr,
    /// Destination network address.
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Parses the header at the start of `buf`.
    ///
    /// Packet-in payloads may be cut short by the switch, so only the header
    /// itself has to be present.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is short or the version/IHL fields are
    /// not a valid IPv4 header.
    pub fn parse(buf: &[u8]) -> PacketResult<Self> {
        ensure_len(buf, MIN_HEADER_LEN, "ipv4 header")?;
        let packet = wire::Ipv4Packet::new_unchecked(buf);

        let header_len = usize::from(packet.header_len());
        if packet.version() != 4 || header_len < MIN_HEADER_LEN {
            return Err(PacketError::Invalid("ipv4 header"));
        }
        ensure_len(buf, header_len, "ipv4 options")?;

        Ok(Self {
            header_len,
            total_len: packet.total_len(),
            ttl: packet.hop_limit(),
            protocol: packet.next_header().into(),
            src: packet.src_addr(),
            dst: packet.dst_addr(),
        })
    }

    /// Builds a header for a datagram carrying `payload_len` bytes, checksum filled in.
    ///
    /// # Errors
    ///
    /// Returns `PacketError::Invalid` if the datagram would exceed 65535 bytes.
    pub fn serialize(
        src: Ipv4Addr,
        dst: Ipv4Addr,
        protocol: u8,
        ttl: u8,
        payload_len: usize,
    ) -> PacketResult<Vec<u8>> {
        if MIN_HEADER_LEN.saturating_add(payload_len) > usize::from(u16::MAX) {
            return Err(PacketError::Invalid("ipv4 total length"));
        }

        let repr = wire::Ipv4Repr {
            src_addr: src,
            dst_addr: dst,
            next_header: protocol.into(),
            payload_len,
            hop_limit: ttl,
        };

        let mut out = vec![0u8; repr.buffer_len()];
        repr.emit(
            &mut wire::Ipv4Packet::new_unchecked(&mut out[..]),
            &ChecksumCapabilities::default(),
        );
        Ok(out)
    }

    /// Replaces the source address of the header at the start of `buf` and
    /// recomputes the header checksum.
    ///
    /// Transport checksums that cover a pseudo-header are left untouched;
    /// the switch-side rewrite does the same.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` does not start with a valid IPv4 header.
    pub fn rewrite_source(buf: &mut [u8], src: Ipv4Addr) -> PacketResult<()> {
        Self::parse(buf)?;
        let mut packet = wire::Ipv4Packet::new_unchecked(buf);
        packet.set_src_addr(src);
        packet.fill_checksum();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checksum_ok(header: &[u8]) -> bool {
        wire::Ipv4Packet::new_unchecked(header).verify_checksum()
    }

    #[test]
    fn test_parse_fields() {
        let header = Ipv4Header::serialize(
            Ipv4Addr::new(10, 0, 0, 3),
            Ipv4Addr::new(10, 0, 0, 13),
            IPPROTO_ICMP,
            64,
            8,
        )
        .unwrap();
        let parsed = Ipv4Header::parse(&header).unwrap();
        assert_eq!(parsed.src, Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(parsed.dst, Ipv4Addr::new(10, 0, 0, 13));
        assert_eq!(parsed.protocol, IPPROTO_ICMP);
        assert_eq!(parsed.header_len, 20);
        assert_eq!(parsed.total_len, 28);
    }

    #[test]
    fn test_serialized_checksum_verifies() {
        let header = Ipv4Header::serialize(
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
            17,
            32,
            100,
        )
        .unwrap();
        assert!(checksum_ok(&header));
        assert_eq!(&header[6..8], &[0x40, 0x00]);
    }

    #[test]
    fn test_rewrite_source_updates_checksum() {
        let mut header = Ipv4Header::serialize(
            Ipv4Addr::new(10, 0, 0, 7),
            Ipv4Addr::new(10, 0, 0, 3),
            IPPROTO_ICMP,
            64,
            0,
        )
        .unwrap();
        Ipv4Header::rewrite_source(&mut header, Ipv4Addr::new(10, 0, 0, 13)).unwrap();

        let parsed = Ipv4Header::parse(&header).unwrap();
        assert_eq!(parsed.src, Ipv4Addr::new(10, 0, 0, 13));
        assert_eq!(parsed.dst, Ipv4Addr::new(10, 0, 0, 3));
        assert!(checksum_ok(&header));
    }

    #[test]
    fn test_serialize_rejects_oversized_payload() {
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);

        let header = Ipv4Header::serialize(src, dst, IPPROTO_ICMP, 64, 65515).unwrap();
        assert_eq!(Ipv4Header::parse(&header).unwrap().total_len, u16::MAX);

        assert_eq!(
            Ipv4Header::serialize(src, dst, IPPROTO_ICMP, 64, 65516),
            Err(PacketError::Invalid("ipv4 total length"))
        );
    }

    #[test]
    fn test_parse_rejects_ipv6() {
        let mut header = vec![0u8; 40];
        header[0] = 0x60;
        assert_eq!(
            Ipv4Header::parse(&header),
            Err(PacketError::Invalid("ipv4 header"))
        );
    }

    #[test]
    fn test_known_checksum() {
        // Classic example header from RFC 1071 discussions.
        let mut header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xb8, 0x61, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert!(checksum_ok(&header));

        header[10] = 0;
        assert!(!checksum_ok(&header));
    }
}
