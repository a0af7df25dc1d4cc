//! Spoofed ARP replies.
//!
//! Every ARP request is answered with the proxy's link address, so clients
//! resolve the proxy IP to the proxy and servers resolve any client IP to the
//! proxy as well. Neither side ever learns a real peer link address.

use super::host::HostRegistry;
use crate::openflow::{FlowAction, OutputPort, PacketOut};
use crate::packet::{ArpOperation, ArpPacket, EtherType, EthernetFrame, MacAddr};
use bytes::Bytes;

/// Builds ARP replies on behalf of the proxy.
#[derive(Debug, Clone, Copy)]
pub struct ArpResponder<'a> {
    registry: &'a HostRegistry,
}

impl<'a> ArpResponder<'a> {
    /// Create a responder for the given registry.
    #[must_use]
    pub fn new(registry: &'a HostRegistry) -> Self {
        Self { registry }
    }

    /// Builds the reply to `request`, received in a frame sent by `frame_src`.
    ///
    /// Clients are told the proxy IP; everyone else gets the requested
    /// address echoed back, bound to the proxy link address.
    #[must_use]
    pub fn build_reply(&self, frame_src: MacAddr, request: &ArpPacket) -> ArpPacket {
        let proxy = self.registry.proxy();
        let sender_proto = if self.registry.is_client_mac(frame_src) {
            proxy.ip()
        } else {
            request.target_proto
        };

        ArpPacket {
            operation: ArpOperation::Reply,
            sender_hw: proxy.mac(),
            sender_proto,
            target_hw: request.sender_hw,
            target_proto: request.sender_proto,
        }
    }

    /// Builds the packet-out carrying the reply back out the arrival port.
    ///
    /// Returns `None` for anything other than a request.
    #[must_use]
    pub fn respond(
        &self,
        frame_src: MacAddr,
        request: &ArpPacket,
        in_port: u16,
    ) -> Option<PacketOut> {
        if request.operation != ArpOperation::Request {
            return None;
        }

        let reply = self.build_reply(frame_src, request);
        let frame = EthernetFrame::serialize(
            frame_src,
            self.registry.proxy().mac(),
            EtherType::ARP,
            &reply.serialize(),
        );

        Some(PacketOut {
            data: Bytes::from(frame),
            in_port: Some(in_port),
            actions: vec![FlowAction::Output(OutputPort::InPort)],
        })
    }
}
