//! Per-switch session.
//!
//! A session owns everything tied to one switch connection: the send handle,
//! the scheduler state and the port statistics poll task. Sessions share the
//! host registry and the controller counters.

use super::arp::ArpResponder;
use super::config::{BalancerConfig, SchedulingPolicy};
use super::error::{BalancerError, BalancerResult};
use super::flow::{self, FlowTimeouts};
use super::host::HostRegistry;
use super::scheduler::Scheduler;
use super::stats::BalancerStats;
use crate::openflow::{
    ConnectionId, ControllerMessage, PacketIn, PortStats, PortStatsRequest, SwitchConnection,
};
use crate::packet::{Frame, Payload};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, poll task not yet running.
    Starting,
    /// Handling events.
    Active,
    /// Torn down; no further messages are sent.
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Active => write!(f, "active"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// What happened to a packet-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDisposition {
    /// An ARP request was answered.
    ArpReplied,
    /// A new client flow was bound to `server`.
    FlowAdmitted {
        /// Network address of the selected server.
        server: Ipv4Addr,
    },
    /// A server packet was rewritten and forwarded to `client`.
    ReplyForwarded {
        /// Network address of the receiving client.
        client: Ipv4Addr,
    },
    /// The packet was discarded.
    Dropped,
    /// Nothing to do for this packet.
    Ignored,
}

/// Per-session settings derived from the balancer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Scheduling policy.
    pub policy: SchedulingPolicy,
    /// Flow rule timeouts.
    pub timeouts: FlowTimeouts,
    /// Period between port statistics requests.
    pub stats_poll_interval: Duration,
}

impl SessionSettings {
    /// Extract session settings from the balancer configuration.
    #[must_use]
    pub fn from_config(config: &BalancerConfig) -> Self {
        Self {
            policy: config.scheduling,
            timeouts: FlowTimeouts {
                idle: config.flow_idle_timeout_secs(),
                hard: config.flow_hard_timeout_secs(),
            },
            stats_poll_interval: config.stats_poll_interval,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&BalancerConfig::default())
    }
}

/// State for one connected switch.
#[derive(Debug)]
pub struct Session {
    connection: ConnectionId,
    handle: Arc<dyn SwitchConnection>,
    registry: Arc<HostRegistry>,
    scheduler: Scheduler,
    settings: SessionSettings,
    stats: Arc<BalancerStats>,
    state: SessionState,
    shutdown: Option<watch::Sender<bool>>,
    poll_task: Option<JoinHandle<()>>,
}

impl Session {
    /// Create a session. The scheduler is seeded here; nothing is sent
    /// until [`Session::start`].
    #[must_use]
    pub fn new(
        connection: ConnectionId,
        handle: Arc<dyn SwitchConnection>,
        registry: Arc<HostRegistry>,
        settings: SessionSettings,
        stats: Arc<BalancerStats>,
    ) -> Self {
        let scheduler = Scheduler::new(settings.policy, registry.servers());
        Self {
            connection,
            handle,
            registry,
            scheduler,
            settings,
            stats,
            state: SessionState::Starting,
            shutdown: None,
            poll_task: None,
        }
    }

    /// Replace the scheduler, e.g. to pin a round-robin cursor.
    pub fn set_scheduler(&mut self, scheduler: Scheduler) {
        self.scheduler = scheduler;
    }

    /// The session's scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Connection this session serves.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` while the poll task is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Activates the session and starts the port statistics poll.
    pub fn start(&mut self) {
        if self.state != SessionState::Starting {
            return;
        }
        self.start_poll_task();
        self.state = SessionState::Active;
        info!(
            connection = %self.connection,
            scheduling = self.scheduler.name(),
            "Session started"
        );
    }

    fn start_poll_task(&mut self) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                debug!("No tokio runtime available, skipping port statistics poll");
                return;
            },
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown = Some(shutdown_tx);

        let task = handle.spawn(poll_port_stats(
            self.connection,
            Arc::clone(&self.handle),
            Arc::clone(&self.stats),
            self.settings.stats_poll_interval,
            shutdown_rx,
        ));
        self.poll_task = Some(task);
    }

    /// Stops the poll task. Idempotent.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.signal_shutdown();
        self.poll_task = None;
        self.state = SessionState::Stopped;
        info!(connection = %self.connection, "Session stopped");
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
    }

    /// Classifies and handles one packet-in.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::NotRunning` unless the session is active,
    /// `BalancerError::Packet` for undecodable frames, and
    /// `BalancerError::Transport` if a reply or rule cannot be sent.
    pub fn handle_packet_in(&mut self, packet: &PacketIn) -> BalancerResult<PacketDisposition> {
        if self.state != SessionState::Active {
            return Err(BalancerError::NotRunning);
        }

        let frame = Frame::parse(&packet.data).inspect_err(|_| self.stats.record_dropped())?;

        match frame.payload {
            Payload::Arp(arp) => {
                let responder = ArpResponder::new(&self.registry);
                match responder.respond(frame.src, &arp, packet.in_port) {
                    Some(reply) => {
                        self.send(reply.into())?;
                        self.stats.record_arp_reply();
                        debug!(
                            connection = %self.connection,
                            requester = %arp.sender_proto,
                            target = %arp.target_proto,
                            "Answered ARP request"
                        );
                        Ok(PacketDisposition::ArpReplied)
                    },
                    None => {
                        self.stats.record_ignored();
                        debug!(operation = ?arp.operation, "Ignoring ARP packet");
                        Ok(PacketDisposition::Ignored)
                    },
                }
            },
            Payload::Ipv4(ip) if self.registry.is_server_mac(frame.src) => {
                match flow::passthrough(&self.registry, &ip, packet) {
                    Ok(out) => {
                        self.send(out.into())?;
                        self.stats.record_passthrough();
                        debug!(
                            connection = %self.connection,
                            server = %ip.src,
                            client = %ip.dst,
                            "Forwarded server packet"
                        );
                        Ok(PacketDisposition::ReplyForwarded { client: ip.dst })
                    },
                    Err(BalancerError::UnknownClient(addr)) => {
                        self.stats.record_dropped();
                        warn!(
                            connection = %self.connection,
                            server = %ip.src,
                            "No client registered for {}, dropping packet",
                            addr
                        );
                        Ok(PacketDisposition::Dropped)
                    },
                    Err(e) => Err(e),
                }
            },
            Payload::Ipv4(ip) => {
                let server = flow::admit_flow(
                    self.handle.as_ref(),
                    &mut self.scheduler,
                    &self.registry,
                    frame.src,
                    &ip,
                    packet,
                    self.settings.timeouts,
                )
                .inspect_err(|e| {
                    if matches!(e, BalancerError::Transport(_)) {
                        self.stats.record_send_failure();
                    }
                })?;
                self.stats.record_flow_admitted();
                info!(
                    connection = %self.connection,
                    client = %ip.src,
                    server = %server.ip(),
                    requests = server.request_count(),
                    "Admitted flow"
                );
                Ok(PacketDisposition::FlowAdmitted { server: server.ip() })
            },
            Payload::Other(ethertype) => {
                self.stats.record_ignored();
                trace!(ethertype, "Ignoring frame with foreign ether-type");
                Ok(PacketDisposition::Ignored)
            },
        }
    }

    /// Logs a port statistics reply.
    pub fn handle_port_stats(&self, stats: &[PortStats]) {
        self.stats.record_stats_reply();
        match serde_json::to_string(stats) {
            Ok(json) => info!(connection = %self.connection, "Port statistics: {}", json),
            Err(e) => {
                warn!(connection = %self.connection, "Failed to encode port statistics: {}", e);
            },
        }
    }

    fn send(&self, message: ControllerMessage) -> BalancerResult<()> {
        self.handle.send(message).map_err(|e| {
            self.stats.record_send_failure();
            e.into()
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

/// Sends a port statistics request every `period` until `shutdown` fires.
/// The first request goes out one full period after start.
async fn poll_port_stats(
    connection: ConnectionId,
    handle: Arc<dyn SwitchConnection>,
    stats: Arc<BalancerStats>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(%connection, "Starting port statistics poll with interval {:?}", period);

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!(%connection, "Port statistics poll shutting down");
                break;
            }
            _ = ticker.tick() => {
                match handle.send(PortStatsRequest::default().into()) {
                    Ok(()) => {
                        stats.record_stats_request();
                        trace!(%connection, "Requested port statistics");
                    }
                    Err(e) => {
                        stats.record_send_failure();
                        warn!(%connection, "Port statistics request failed: {}", e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::proxy_balancer::scheduler::RoundRobinStrategy;
    use crate::openflow::ChannelConnection;
    use crate::packet::{ArpOperation, ArpPacket, EtherType, EthernetFrame, MacAddr};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn mac(last: u8) -> MacAddr {
        MacAddr([0, 0, 0, 0, 0, last])
    }

    fn session() -> (Session, UnboundedReceiver<ControllerMessage>) {
        let registry = Arc::new(HostRegistry::from_config(&BalancerConfig::default()).unwrap());
        let (connection, rx) = ChannelConnection::new();
        let session = Session::new(
            ConnectionId(1),
            Arc::new(connection),
            registry,
            SessionSettings::default(),
            Arc::new(BalancerStats::new()),
        );
        (session, rx)
    }

    fn arp_request() -> PacketIn {
        let arp = ArpPacket {
            operation: ArpOperation::Request,
            sender_hw: mac(0x03),
            sender_proto: Ipv4Addr::new(10, 0, 0, 3),
            target_hw: MacAddr::ZERO,
            target_proto: Ipv4Addr::new(10, 0, 0, 13),
        };
        let arp_bytes = arp.serialize();
        let frame =
            EthernetFrame::serialize(MacAddr::BROADCAST, mac(0x03), EtherType::ARP, &arp_bytes);
        PacketIn::new(frame, 3)
    }

    #[test]
    fn test_packet_before_start_is_rejected() {
        let (mut session, _rx) = session();
        assert_eq!(session.state(), SessionState::Starting);
        assert!(matches!(
            session.handle_packet_in(&arp_request()),
            Err(BalancerError::NotRunning)
        ));
    }

    #[test]
    fn test_start_without_runtime_skips_poll() {
        let (mut session, _rx) = session();
        session.start();
        assert_eq!(session.state(), SessionState::Active);
        assert!(!session.is_polling());
    }

    #[test]
    fn test_arp_request_answered() {
        let (mut session, mut rx) = session();
        session.start();

        let disposition = session.handle_packet_in(&arp_request()).unwrap();
        assert_eq!(disposition, PacketDisposition::ArpReplied);

        let out = rx.try_recv().unwrap();
        let out = out.as_packet_out().unwrap();
        assert_eq!(out.in_port, Some(3));
    }

    #[test]
    fn test_unknown_ethertype_ignored() {
        let (mut session, mut rx) = session();
        session.start();

        let frame = EthernetFrame::serialize(mac(0x13), mac(0x03), 0x86dd, &[0u8; 40]);
        let disposition = session.handle_packet_in(&PacketIn::new(frame, 3)).unwrap();
        assert_eq!(disposition, PacketDisposition::Ignored);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_truncated_frame_is_packet_error() {
        let (mut session, _rx) = session();
        session.start();

        let result = session.handle_packet_in(&PacketIn::new(vec![0u8; 6], 3));
        assert!(matches!(result, Err(BalancerError::Packet(_))));
    }

    #[test]
    fn test_pinned_scheduler() {
        let (mut session, _rx) = session();
        let servers = Arc::clone(&session.registry);
        session.set_scheduler(Scheduler::with_strategy(
            SchedulingPolicy::RoundRobin,
            Box::new(RoundRobinStrategy::with_cursor(5)),
        ));
        assert_eq!(session.scheduler().name(), "round-robin");
        let picked = session.scheduler.select_server(servers.servers()).unwrap();
        assert_eq!(picked.ip(), Ipv4Addr::new(10, 0, 0, 7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_starts_after_one_period() {
        let (mut session, mut rx) = session();
        session.start();
        assert!(session.is_polling());

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(rx.try_recv(), Ok(ControllerMessage::PortStatsRequest(_))));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(matches!(rx.try_recv(), Ok(ControllerMessage::PortStatsRequest(_))));
        assert_eq!(session.stats.stats_requests(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_poll() {
        let (mut session, mut rx) = session();
        session.start();

        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            session.handle_packet_in(&arp_request()),
            Err(BalancerError::NotRunning)
        ));
    }
}
