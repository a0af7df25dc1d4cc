//! Session lifecycle and event dispatch.

use super::config::BalancerConfig;
use super::error::{BalancerError, BalancerResult};
use super::host::HostRegistry;
use super::session::{PacketDisposition, Session, SessionSettings};
use super::stats::BalancerStats;
use crate::module::{
    MetricsPayload, ModuleConfig, ModuleContract, ModuleError, ModuleResult, ModuleStatus,
};
use crate::openflow::{ConnectionId, PacketIn, PortStats, SwitchConnection, SwitchEvent};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// The proxy balancer controller.
///
/// Owns the host registry and one [`Session`] per connected switch. Events
/// are handled one at a time, in arrival order.
#[derive(Debug)]
pub struct Controller {
    config: BalancerConfig,
    settings: SessionSettings,
    registry: Arc<HostRegistry>,
    sessions: HashMap<ConnectionId, Session>,
    stats: Arc<BalancerStats>,
    status: ModuleStatus,
}

impl Controller {
    /// Create a controller from configuration.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` if the host layout or timing is invalid.
    pub fn new(config: BalancerConfig) -> BalancerResult<Self> {
        let registry = Self::build_registry(&config)?;
        Ok(Self {
            settings: SessionSettings::from_config(&config),
            config,
            registry: Arc::new(registry),
            sessions: HashMap::new(),
            stats: Arc::new(BalancerStats::new()),
            status: ModuleStatus::Initializing,
        })
    }

    fn build_registry(config: &BalancerConfig) -> BalancerResult<HostRegistry> {
        let timing = config.check_timing();
        if !timing.is_valid() {
            return Err(BalancerError::Config(timing.summary()));
        }
        HostRegistry::from_config(config)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Shared host registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<BalancerStats> {
        &self.stats
    }

    /// Session for `connection`, if connected.
    #[must_use]
    pub fn session(&self, connection: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection)
    }

    /// Mutable session for `connection`, if connected.
    pub fn session_mut(&mut self, connection: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(&connection)
    }

    /// Number of connected switches.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Flows assigned to each server so far, in pool order.
    #[must_use]
    pub fn server_request_counts(&self) -> Vec<(Ipv4Addr, u64)> {
        self.registry
            .servers()
            .hosts()
            .iter()
            .map(|server| (server.ip(), server.request_count()))
            .collect()
    }

    /// Dispatches one switch event.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::NotRunning` before `start`/after `stop`,
    /// `BalancerError::SessionNotFound` for events on unknown connections,
    /// and whatever the session reports for packet handling.
    pub fn handle_event(&mut self, event: SwitchEvent) -> BalancerResult<()> {
        self.ensure_running()?;

        match event {
            SwitchEvent::ConnectionUp { connection, handle } => {
                self.on_connection_up(connection, handle)
            },
            SwitchEvent::ConnectionDown { connection } => self.on_connection_down(connection),
            SwitchEvent::PacketIn { connection, packet } => {
                let disposition = self.on_packet_in(connection, &packet)?;
                trace!(%connection, ?disposition, "Packet handled");
                Ok(())
            },
            SwitchEvent::PortStatsReceived { connection, stats } => {
                self.on_port_stats(connection, &stats)
            },
        }
    }

    fn ensure_running(&self) -> BalancerResult<()> {
        if self.status == ModuleStatus::Running {
            Ok(())
        } else {
            Err(BalancerError::NotRunning)
        }
    }

    /// Creates and starts a session for a new connection. A session already
    /// registered under the same id is stopped and replaced.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::NotRunning` unless the controller is running.
    pub fn on_connection_up(
        &mut self,
        connection: ConnectionId,
        handle: Arc<dyn SwitchConnection>,
    ) -> BalancerResult<()> {
        self.ensure_running()?;

        let mut session = Session::new(
            connection,
            handle,
            Arc::clone(&self.registry),
            self.settings,
            Arc::clone(&self.stats),
        );
        session.start();

        if let Some(mut previous) = self.sessions.insert(connection, session) {
            warn!(%connection, "Switch reconnected, replacing existing session");
            previous.stop();
        }

        info!(
            %connection,
            sessions = self.sessions.len(),
            "Switch connected"
        );
        Ok(())
    }

    /// Stops and removes the session for a closed connection.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::NotRunning` unless the controller is running.
    pub fn on_connection_down(&mut self, connection: ConnectionId) -> BalancerResult<()> {
        self.ensure_running()?;

        match self.sessions.remove(&connection) {
            Some(mut session) => {
                session.stop();
                info!(
                    %connection,
                    sessions = self.sessions.len(),
                    "Switch disconnected"
                );
            },
            None => debug!(%connection, "Disconnect for unknown connection"),
        }
        Ok(())
    }

    /// Routes a packet-in to its session.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::NotRunning` unless the controller is running,
    /// `BalancerError::SessionNotFound` for unknown connections and any error
    /// the session reports.
    pub fn on_packet_in(
        &mut self,
        connection: ConnectionId,
        packet: &PacketIn,
    ) -> BalancerResult<PacketDisposition> {
        self.ensure_running()?;

        let session = self
            .sessions
            .get_mut(&connection)
            .ok_or(BalancerError::SessionNotFound(connection))?;
        session.handle_packet_in(packet)
    }

    /// Routes a port statistics reply to its session.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::NotRunning` unless the controller is running and
    /// `BalancerError::SessionNotFound` for unknown connections.
    pub fn on_port_stats(
        &self,
        connection: ConnectionId,
        stats: &[PortStats],
    ) -> BalancerResult<()> {
        self.ensure_running()?;

        let session = self
            .sessions
            .get(&connection)
            .ok_or(BalancerError::SessionNotFound(connection))?;
        session.handle_port_stats(stats);
        Ok(())
    }

    /// Handles events until the channel closes. Errors are logged and never
    /// end the loop.
    pub async fn run_event_loop(&mut self, mut events: mpsc::Receiver<SwitchEvent>) {
        info!("Waiting for switch events");

        while let Some(event) = events.recv().await {
            let connection = event.connection();
            match self.handle_event(event) {
                Ok(()) => {},
                Err(BalancerError::SessionNotFound(_)) => {
                    debug!(%connection, "Event for unknown connection ignored");
                },
                Err(e) => warn!(%connection, "Failed to handle switch event: {}", e),
            }
        }

        info!("Switch event channel closed");
    }
}

impl ModuleContract for Controller {
    fn name(&self) -> &'static str {
        "proxy_balancer"
    }

    fn init(&mut self, config: ModuleConfig) -> ModuleResult<()> {
        if self.status == ModuleStatus::Running {
            return Err(ModuleError::InvalidState {
                current: self.status.to_string(),
                expected: "initializing or stopped".to_string(),
            });
        }

        info!("Initializing proxy balancer");

        let balancer_config: BalancerConfig = match config.raw_config() {
            Some(raw) => toml::from_str(raw)
                .map_err(|e| ModuleError::ConfigError(format!("failed to parse config: {e}")))?,
            None => BalancerConfig::default(),
        };

        let registry = Self::build_registry(&balancer_config)
            .map_err(|e| ModuleError::ConfigError(e.to_string()))?;

        debug!(
            clients = registry.clients().len(),
            servers = registry.servers().len(),
            proxy = %registry.proxy(),
            scheduling = %balancer_config.scheduling,
            "Built host registry"
        );

        self.settings = SessionSettings::from_config(&balancer_config);
        self.registry = Arc::new(registry);
        self.config = balancer_config;
        self.status = ModuleStatus::Initializing;

        info!("Proxy balancer initialized");
        Ok(())
    }

    fn start(&mut self) -> ModuleResult<()> {
        if self.status == ModuleStatus::Running {
            return Err(ModuleError::InvalidState {
                current: self.status.to_string(),
                expected: "initializing or stopped".to_string(),
            });
        }

        self.status = ModuleStatus::Running;
        info!(
            proxy = %self.registry.proxy().ip(),
            servers = self.registry.servers().len(),
            scheduling = %self.config.scheduling,
            "Proxy balancer started"
        );
        Ok(())
    }

    fn stop(&mut self) -> ModuleResult<()> {
        if self.status != ModuleStatus::Running {
            return Err(ModuleError::InvalidState {
                current: self.status.to_string(),
                expected: "running".to_string(),
            });
        }

        info!(sessions = self.sessions.len(), "Stopping proxy balancer");
        for (_, mut session) in self.sessions.drain() {
            session.stop();
        }
        self.status = ModuleStatus::Stopped;

        info!("Proxy balancer stopped");
        Ok(())
    }

    fn status(&self) -> ModuleStatus {
        self.status.clone()
    }

    fn metrics(&self) -> MetricsPayload {
        let mut metrics = MetricsPayload::new();
        self.stats.fill(&mut metrics);
        metrics.gauge("active_sessions", self.sessions.len() as f64);
        metrics.gauge("servers", self.registry.servers().len() as f64);
        metrics
    }
}
