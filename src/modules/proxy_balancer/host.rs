//! Host identities and the client/server pools.

use super::config::{BalancerConfig, HostRangeConfig};
use super::error::{BalancerError, BalancerResult};
use crate::packet::MacAddr;
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A network endpoint known to the balancer.
#[derive(Debug)]
pub struct Host {
    mac: MacAddr,
    ip: Ipv4Addr,
    /// Switch port the host is attached to. `None` for the virtual proxy.
    port: Option<u16>,
    /// Flows assigned to this host while acting as a server.
    request_count: AtomicU64,
}

impl Host {
    /// Create a new host.
    #[must_use]
    pub fn new(mac: MacAddr, ip: Ipv4Addr, port: Option<u16>) -> Self {
        Self {
            mac,
            ip,
            port,
            request_count: AtomicU64::new(0),
        }
    }

    /// Link address.
    #[must_use]
    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    /// Network address.
    #[must_use]
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// Attachment port on the switch.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Flows assigned so far.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Records one more assigned flow and returns the new total.
    pub fn record_request(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "MAC: {} | IP: {} | Port: {}", self.mac, self.ip, port),
            None => write!(f, "MAC: {} | IP: {}", self.mac, self.ip),
        }
    }
}

/// Derives host addresses from a numeric suffix.
///
/// Suffix `n` maps to link address `<mac_prefix>:<nn>` where the two decimal
/// digits of `n` are read as hex (13 becomes `0x13`), network address
/// `<ip_prefix>.n`, and switch port `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPlan {
    mac_prefix: [u8; 5],
    ip_prefix: [u8; 3],
}

impl AddressPlan {
    /// Create a plan from parsed prefixes.
    #[must_use]
    pub const fn new(mac_prefix: [u8; 5], ip_prefix: [u8; 3]) -> Self {
        Self {
            mac_prefix,
            ip_prefix,
        }
    }

    /// Parse the prefixes of a configuration.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` if either prefix is malformed.
    pub fn from_config(config: &BalancerConfig) -> BalancerResult<Self> {
        let mac_prefix = config
            .network
            .mac_prefix_octets()
            .map_err(BalancerError::Config)?;
        let ip_prefix = config
            .network
            .ip_prefix_octets()
            .map_err(BalancerError::Config)?;
        Ok(Self::new(mac_prefix, ip_prefix))
    }

    /// Link address for `suffix`.
    #[must_use]
    pub const fn mac(&self, suffix: u8) -> MacAddr {
        MacAddr::from_prefix(self.mac_prefix, (suffix / 10) * 16 + suffix % 10)
    }

    /// Network address for `suffix`.
    #[must_use]
    pub const fn ip(&self, suffix: u8) -> Ipv4Addr {
        let [a, b, c] = self.ip_prefix;
        Ipv4Addr::new(a, b, c, suffix)
    }

    /// Physical host for `suffix`, attached to switch port `suffix`.
    #[must_use]
    pub fn host(&self, suffix: u8) -> Host {
        Host::new(self.mac(suffix), self.ip(suffix), Some(u16::from(suffix)))
    }

    /// Virtual host for `suffix`, with no attachment port.
    #[must_use]
    pub fn virtual_host(&self, suffix: u8) -> Host {
        Host::new(self.mac(suffix), self.ip(suffix), None)
    }
}

/// An ordered, non-empty set of hosts indexed by both addresses.
#[derive(Debug)]
pub struct HostPool {
    hosts: Vec<Arc<Host>>,
    by_mac: HashMap<MacAddr, usize>,
    by_ip: HashMap<Ipv4Addr, usize>,
}

impl HostPool {
    /// Builds a pool in the given order. Duplicate addresses resolve to the
    /// first host carrying them.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` if `hosts` is empty.
    pub fn new(hosts: Vec<Host>) -> BalancerResult<Self> {
        if hosts.is_empty() {
            return Err(BalancerError::Config("host pool is empty".to_string()));
        }

        let hosts: Vec<Arc<Host>> = hosts.into_iter().map(Arc::new).collect();
        let mut by_mac = HashMap::with_capacity(hosts.len());
        let mut by_ip = HashMap::with_capacity(hosts.len());
        for (index, host) in hosts.iter().enumerate() {
            by_mac.entry(host.mac()).or_insert(index);
            by_ip.entry(host.ip()).or_insert(index);
        }

        Ok(Self {
            hosts,
            by_mac,
            by_ip,
        })
    }

    /// Builds a pool from a suffix range.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` if the range is empty.
    pub fn from_range(plan: &AddressPlan, range: &HostRangeConfig) -> BalancerResult<Self> {
        Self::new(range.suffixes().map(|suffix| plan.host(suffix)).collect())
    }

    /// Host with the given link address.
    #[must_use]
    pub fn lookup_by_mac(&self, mac: MacAddr) -> Option<&Arc<Host>> {
        self.by_mac.get(&mac).map(|&i| &self.hosts[i])
    }

    /// Host with the given network address.
    #[must_use]
    pub fn lookup_by_ip(&self, ip: Ipv4Addr) -> Option<&Arc<Host>> {
        self.by_ip.get(&ip).map(|&i| &self.hosts[i])
    }

    /// Returns `true` if a host in the pool has this link address.
    #[must_use]
    pub fn contains_mac(&self, mac: MacAddr) -> bool {
        self.by_mac.contains_key(&mac)
    }

    /// Host at `index`, in construction order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Host>> {
        self.hosts.get(index)
    }

    /// All hosts, in construction order.
    #[must_use]
    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    /// Number of hosts. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns `true` if the pool has no hosts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Clients, servers and the proxy identity, shared read-only by every session.
#[derive(Debug)]
pub struct HostRegistry {
    clients: HostPool,
    servers: HostPool,
    proxy: Arc<Host>,
}

impl HostRegistry {
    /// Assembles a registry from prebuilt pools.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` if the pools share an address or
    /// the proxy collides with a pool member.
    pub fn new(clients: HostPool, servers: HostPool, proxy: Host) -> BalancerResult<Self> {
        for server in servers.hosts() {
            if clients.contains_mac(server.mac()) || clients.lookup_by_ip(server.ip()).is_some() {
                return Err(BalancerError::Config(format!(
                    "server {server} is also registered as a client"
                )));
            }
        }

        let collides = |pool: &HostPool| {
            pool.contains_mac(proxy.mac()) || pool.lookup_by_ip(proxy.ip()).is_some()
        };
        if collides(&clients) || collides(&servers) {
            return Err(BalancerError::Config(format!(
                "proxy {proxy} collides with a pool member"
            )));
        }

        Ok(Self {
            clients,
            servers,
            proxy: Arc::new(proxy),
        })
    }

    /// Builds the registry described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` if the layout is invalid.
    pub fn from_config(config: &BalancerConfig) -> BalancerResult<Self> {
        let layout = config.check_layout();
        if !layout.is_valid() {
            return Err(BalancerError::Config(layout.summary()));
        }

        let plan = AddressPlan::from_config(config)?;
        Self::new(
            HostPool::from_range(&plan, &config.clients)?,
            HostPool::from_range(&plan, &config.servers)?,
            plan.virtual_host(config.proxy.suffix),
        )
    }

    /// Client pool.
    #[must_use]
    pub fn clients(&self) -> &HostPool {
        &self.clients
    }

    /// Server pool.
    #[must_use]
    pub fn servers(&self) -> &HostPool {
        &self.servers
    }

    /// Proxy identity.
    #[must_use]
    pub fn proxy(&self) -> &Arc<Host> {
        &self.proxy
    }

    /// Returns `true` if the link address belongs to a client.
    #[must_use]
    pub fn is_client_mac(&self, mac: MacAddr) -> bool {
        self.clients.contains_mac(mac)
    }

    /// Returns `true` if the link address belongs to a server.
    #[must_use]
    pub fn is_server_mac(&self, mac: MacAddr) -> bool {
        self.servers.contains_mac(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_registry() -> HostRegistry {
        HostRegistry::from_config(&BalancerConfig::default()).unwrap()
    }

    #[test]
    fn test_address_derivation() {
        let plan = AddressPlan::new([0; 5], [10, 0, 0]);

        assert_eq!(plan.mac(13).to_string(), "00:00:00:00:00:13");
        assert_eq!(plan.mac(7).to_string(), "00:00:00:00:00:07");
        assert_eq!(plan.mac(99).to_string(), "00:00:00:00:00:99");
        assert_eq!(plan.ip(13), Ipv4Addr::new(10, 0, 0, 13));

        let host = plan.host(8);
        assert_eq!(host.port(), Some(8));
        assert!(plan.virtual_host(13).port().is_none());
    }

    #[test]
    fn test_default_registry_layout() {
        let registry = default_registry();
        assert_eq!(registry.clients().len(), 6);
        assert_eq!(registry.servers().len(), 6);
        assert_eq!(registry.proxy().ip(), Ipv4Addr::new(10, 0, 0, 13));
        assert_eq!(registry.proxy().mac().to_string(), "00:00:00:00:00:13");

        let first = registry.servers().get(0).unwrap();
        assert_eq!(first.ip(), Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(first.port(), Some(7));
    }

    #[test]
    fn test_lookup() {
        let registry = default_registry();
        let mac: MacAddr = "00:00:00:00:00:03".parse().unwrap();

        let client = registry.clients().lookup_by_mac(mac).unwrap();
        assert_eq!(client.ip(), Ipv4Addr::new(10, 0, 0, 3));
        assert!(registry.is_client_mac(mac));
        assert!(!registry.is_server_mac(mac));

        let by_ip = registry.clients().lookup_by_ip(Ipv4Addr::new(10, 0, 0, 3)).unwrap();
        assert!(Arc::ptr_eq(client, by_ip));
        assert!(registry.clients().lookup_by_ip(Ipv4Addr::new(10, 0, 0, 42)).is_none());
    }

    #[test]
    fn test_pool_rejects_empty() {
        assert!(matches!(HostPool::new(Vec::new()), Err(BalancerError::Config(_))));
    }

    #[test]
    fn test_pool_duplicate_resolves_to_first() {
        let plan = AddressPlan::new([0; 5], [10, 0, 0]);
        let pool = HostPool::new(vec![plan.host(1), plan.host(1), plan.host(2)]).unwrap();
        let first = pool.get(0).unwrap();
        assert!(Arc::ptr_eq(pool.lookup_by_ip(plan.ip(1)).unwrap(), first));
    }

    #[test]
    fn test_registry_rejects_shared_host() {
        let plan = AddressPlan::new([0; 5], [10, 0, 0]);
        let clients = HostPool::new(vec![plan.host(1), plan.host(2)]).unwrap();
        let servers = HostPool::new(vec![plan.host(2), plan.host(3)]).unwrap();

        let result = HostRegistry::new(clients, servers, plan.virtual_host(13));
        assert!(matches!(result, Err(BalancerError::Config(_))));
    }

    #[test]
    fn test_registry_rejects_bad_layout() {
        let mut config = BalancerConfig::default();
        config.proxy.suffix = 3;
        assert!(matches!(
            HostRegistry::from_config(&config),
            Err(BalancerError::Config(_))
        ));
    }

    #[test]
    fn test_request_count() {
        let registry = default_registry();
        let server = registry.servers().get(2).unwrap();
        assert_eq!(server.request_count(), 0);
        assert_eq!(server.record_request(), 1);
        assert_eq!(server.record_request(), 2);
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn test_host_display() {
        let plan = AddressPlan::new([0; 5], [10, 0, 0]);
        assert_eq!(
            plan.host(7).to_string(),
            "MAC: 00:00:00:00:00:07 | IP: 10.0.0.7 | Port: 7"
        );
        assert_eq!(
            plan.virtual_host(13).to_string(),
            "MAC: 00:00:00:00:00:13 | IP: 10.0.0.13"
        );
    }
}
