//! Flow admission and reply passthrough.
//!
//! ```text
//!   client ──▶ proxy ip ───[client→server rule]───▶ server
//!   client ◀── proxy ip ◀──[server→client rule]──── server
//! ```
//!
//! The reverse rule is always sent before the forward one, so the first
//! server response never reaches the controller.

use super::error::{BalancerError, BalancerResult};
use super::host::{Host, HostRegistry};
use super::scheduler::Scheduler;
use crate::openflow::{
    ControllerMessage, FlowAction, FlowMatch, FlowMod, OutputPort, PacketIn, PacketOut,
    SwitchConnection,
};
use crate::packet::{EtherType, EthernetFrame, Ipv4Header, MacAddr};
use bytes::BytesMut;
use std::sync::Arc;

/// Timeouts applied to installed flow rules, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTimeouts {
    /// Idle timeout.
    pub idle: u16,
    /// Hard timeout.
    pub hard: u16,
}

impl Default for FlowTimeouts {
    fn default() -> Self {
        Self { idle: 10, hard: 10 }
    }
}

/// The two rules that bind one client flow to one server.
#[derive(Debug, Clone)]
pub struct AdmissionPlan {
    /// Selected server.
    pub server: Arc<Host>,
    /// Rewrites server responses to appear to come from the proxy.
    pub server_to_client: FlowMod,
    /// Redirects client traffic for the proxy to the server. Carries the
    /// triggering packet.
    pub client_to_server: FlowMod,
}

impl AdmissionPlan {
    /// Builds both rules for a packet from `frame_src` addressed to the proxy.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::NoAttachmentPort` if the server has no port.
    pub fn build(
        registry: &HostRegistry,
        server: Arc<Host>,
        frame_src: MacAddr,
        ip: &Ipv4Header,
        packet: &PacketIn,
        timeouts: FlowTimeouts,
    ) -> BalancerResult<Self> {
        let proxy = registry.proxy();
        let server_port = server
            .port()
            .ok_or(BalancerError::NoAttachmentPort(server.ip()))?;

        let server_to_client = FlowMod {
            matching: FlowMatch {
                in_port: Some(server_port),
                dl_type: Some(EtherType::IPV4),
                dl_src: Some(server.mac()),
                dl_dst: Some(proxy.mac()),
                nw_src: Some(server.ip()),
                nw_dst: Some(ip.src),
            },
            actions: vec![
                FlowAction::SetDlSrc(proxy.mac()),
                FlowAction::SetDlDst(frame_src),
                FlowAction::SetNwSrc(proxy.ip()),
                FlowAction::Output(OutputPort::Physical(packet.in_port)),
            ],
            idle_timeout: timeouts.idle,
            hard_timeout: timeouts.hard,
            packet: None,
        };

        let client_to_server = FlowMod {
            matching: FlowMatch {
                in_port: Some(packet.in_port),
                dl_type: Some(EtherType::IPV4),
                dl_src: Some(frame_src),
                dl_dst: Some(proxy.mac()),
                nw_src: Some(ip.src),
                nw_dst: Some(proxy.ip()),
            },
            actions: vec![
                FlowAction::SetDlDst(server.mac()),
                FlowAction::SetNwDst(server.ip()),
                FlowAction::Output(OutputPort::Physical(server_port)),
            ],
            idle_timeout: timeouts.idle,
            hard_timeout: timeouts.hard,
            packet: Some(packet.pending_packet()),
        };

        Ok(Self {
            server,
            server_to_client,
            client_to_server,
        })
    }

    /// The rules in installation order.
    #[must_use]
    pub fn into_messages(self) -> [ControllerMessage; 2] {
        [
            ControllerMessage::FlowMod(self.server_to_client),
            ControllerMessage::FlowMod(self.client_to_server),
        ]
    }
}

/// Selects a server for a new flow and installs both rules.
///
/// Stops at the first failed send, so a forward rule is never installed
/// without its reverse rule being handed to the transport first.
///
/// # Errors
///
/// Returns `BalancerError::Transport` if either rule cannot be sent.
pub fn admit_flow(
    connection: &dyn SwitchConnection,
    scheduler: &mut Scheduler,
    registry: &HostRegistry,
    frame_src: MacAddr,
    ip: &Ipv4Header,
    packet: &PacketIn,
    timeouts: FlowTimeouts,
) -> BalancerResult<Arc<Host>> {
    let server = scheduler
        .select_server(registry.servers())
        .ok_or_else(|| BalancerError::Config("server pool is empty".to_string()))?;
    let plan = AdmissionPlan::build(registry, server, frame_src, ip, packet, timeouts)?;
    let server = Arc::clone(&plan.server);

    for message in plan.into_messages() {
        connection.send(message)?;
    }

    Ok(server)
}

/// Rewrites a server-originated packet so it appears to come from the proxy
/// and addresses it to the owning client.
///
/// # Errors
///
/// Returns `BalancerError::UnknownClient` if no client owns `ip.dst`, and
/// `BalancerError::Packet` if the frame cannot be rewritten.
pub fn passthrough(
    registry: &HostRegistry,
    ip: &Ipv4Header,
    packet: &PacketIn,
) -> BalancerResult<PacketOut> {
    let client = registry
        .clients()
        .lookup_by_ip(ip.dst)
        .ok_or(BalancerError::UnknownClient(ip.dst))?;
    let client_port = client
        .port()
        .ok_or(BalancerError::NoAttachmentPort(client.ip()))?;
    let proxy = registry.proxy();

    let mut data = BytesMut::from(&packet.data[..]);
    EthernetFrame::rewrite_addresses(&mut data, proxy.mac(), client.mac())?;
    Ipv4Header::rewrite_source(&mut data[EthernetFrame::HEADER_LEN..], proxy.ip())?;

    Ok(PacketOut {
        data: data.freeze(),
        in_port: Some(packet.in_port),
        actions: vec![FlowAction::Output(OutputPort::Physical(client_port))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::proxy_balancer::scheduler::RoundRobinStrategy;
    use crate::modules::proxy_balancer::{BalancerConfig, SchedulingPolicy};
    use crate::openflow::{ChannelConnection, PendingPacket};
    use crate::packet::ipv4::IPPROTO_ICMP;
    use smoltcp::wire::Ipv4Packet;
    use crate::packet::{Frame, Payload};
    use std::net::Ipv4Addr;

    fn registry() -> HostRegistry {
        HostRegistry::from_config(&BalancerConfig::default()).unwrap()
    }

    fn mac(last: u8) -> MacAddr {
        MacAddr([0, 0, 0, 0, 0, last])
    }

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn ipv4_frame(src_mac: MacAddr, dst_mac: MacAddr, src: Ipv4Addr, dst: Ipv4Addr) -> Vec<u8> {
        let payload = [8u8, 0, 0, 0, 0, 1, 0, 1];
        let mut datagram =
            Ipv4Header::serialize(src, dst, IPPROTO_ICMP, 64, payload.len()).unwrap();
        datagram.extend_from_slice(&payload);
        EthernetFrame::serialize(dst_mac, src_mac, EtherType::IPV4, &datagram)
    }

    fn header_of(data: &[u8]) -> Ipv4Header {
        match Frame::parse(data).unwrap().payload {
            Payload::Ipv4(header) => header,
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_admission_plan_fields() {
        let registry = registry();
        let server = Arc::clone(registry.servers().get(1).unwrap());
        let data = ipv4_frame(mac(0x03), mac(0x13), ip(3), ip(13));
        let header = header_of(&data);
        let packet = PacketIn::new(data, 3).with_buffer_id(77);

        let timeouts = FlowTimeouts::default();
        let plan =
            AdmissionPlan::build(&registry, server, mac(0x03), &header, &packet, timeouts).unwrap();

        let reverse = &plan.server_to_client;
        assert_eq!(reverse.matching.in_port, Some(8));
        assert_eq!(reverse.matching.dl_src, Some(mac(0x08)));
        assert_eq!(reverse.matching.dl_dst, Some(mac(0x13)));
        assert_eq!(reverse.matching.nw_src, Some(Ipv4Addr::new(10, 0, 0, 8)));
        assert_eq!(reverse.matching.nw_dst, Some(Ipv4Addr::new(10, 0, 0, 3)));
        assert_eq!(
            reverse.actions,
            vec![
                FlowAction::SetDlSrc(mac(0x13)),
                FlowAction::SetDlDst(mac(0x03)),
                FlowAction::SetNwSrc(Ipv4Addr::new(10, 0, 0, 13)),
                FlowAction::Output(OutputPort::Physical(3)),
            ]
        );
        assert!(reverse.packet.is_none());
        assert_eq!((reverse.idle_timeout, reverse.hard_timeout), (10, 10));

        let forward = &plan.client_to_server;
        assert_eq!(forward.matching.in_port, Some(3));
        assert_eq!(forward.matching.dl_type, Some(EtherType::IPV4));
        assert_eq!(forward.matching.nw_dst, Some(Ipv4Addr::new(10, 0, 0, 13)));
        assert_eq!(
            forward.actions,
            vec![
                FlowAction::SetDlDst(mac(0x08)),
                FlowAction::SetNwDst(Ipv4Addr::new(10, 0, 0, 8)),
                FlowAction::Output(OutputPort::Physical(8)),
            ]
        );
        assert_eq!(
            forward.packet,
            Some(PendingPacket::Buffered {
                buffer_id: 77,
                in_port: 3
            })
        );
    }

    #[test]
    fn test_admit_flow_sends_reverse_rule_first() {
        let registry = registry();
        let (connection, mut rx) = ChannelConnection::new();
        let mut scheduler = Scheduler::with_strategy(
            SchedulingPolicy::RoundRobin,
            Box::new(RoundRobinStrategy::with_cursor(0)),
        );
        let data = ipv4_frame(mac(0x01), mac(0x13), ip(1), ip(13));
        let header = header_of(&data);
        let packet = PacketIn::new(data, 1);

        let server = admit_flow(
            &connection,
            &mut scheduler,
            &registry,
            mac(0x01),
            &header,
            &packet,
            FlowTimeouts::default(),
        )
        .unwrap();
        assert_eq!(server.ip(), Ipv4Addr::new(10, 0, 0, 8));
        assert_eq!(server.request_count(), 1);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(first.as_flow_mod().unwrap().matching.in_port, Some(8));
        let forward = second.as_flow_mod().unwrap();
        assert_eq!(forward.matching.in_port, Some(1));
        assert!(matches!(forward.packet, Some(PendingPacket::Unbuffered { in_port: 1, .. })));
    }

    #[test]
    fn test_admit_flow_stops_on_closed_transport() {
        let registry = registry();
        let (connection, rx) = ChannelConnection::new();
        drop(rx);
        let mut scheduler = Scheduler::new(SchedulingPolicy::Random, registry.servers());
        let data = ipv4_frame(mac(0x01), mac(0x13), ip(1), ip(13));
        let header = header_of(&data);

        let result = admit_flow(
            &connection,
            &mut scheduler,
            &registry,
            mac(0x01),
            &header,
            &PacketIn::new(data, 1),
            FlowTimeouts::default(),
        );
        assert!(matches!(result, Err(BalancerError::Transport(_))));
    }

    #[test]
    fn test_passthrough_rewrites_to_proxy() {
        let registry = registry();
        let data = ipv4_frame(mac(0x09), mac(0x13), ip(9), ip(2));
        let header = header_of(&data);
        let packet = PacketIn::new(data.clone(), 9);

        let out = passthrough(&registry, &header, &packet).unwrap();
        assert_eq!(out.in_port, Some(9));
        assert_eq!(out.actions, vec![FlowAction::Output(OutputPort::Physical(2))]);

        let frame = Frame::parse(&out.data).unwrap();
        assert_eq!(frame.src, mac(0x13));
        assert_eq!(frame.dst, mac(0x02));
        let rewritten = header_of(&out.data);
        assert_eq!(rewritten.src, Ipv4Addr::new(10, 0, 0, 13));
        assert_eq!(rewritten.dst, Ipv4Addr::new(10, 0, 0, 2));

        let ip_start = EthernetFrame::HEADER_LEN;
        let ip_bytes = &out.data[ip_start..ip_start + rewritten.header_len];
        assert!(Ipv4Packet::new_unchecked(ip_bytes).verify_checksum());
        assert_eq!(&out.data[34..], &data[34..]);
    }

    #[test]
    fn test_passthrough_unknown_client() {
        let registry = registry();
        let data = ipv4_frame(mac(0x09), mac(0x13), ip(9), ip(42));
        let header = header_of(&data);

        let result = passthrough(&registry, &header, &PacketIn::new(data, 9));
        assert!(matches!(
            result,
            Err(BalancerError::UnknownClient(addr)) if addr == ip(42)
        ));
    }
}
