//! Balancer configuration types.

use crate::config::{ValidationError, ValidationResult};
use crate::packet::MacAddr;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Largest host suffix the address derivation supports.
pub const MAX_HOST_SUFFIX: u8 = 99;

/// Configuration for the balancer core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Backend scheduling policy, fixed for the lifetime of the process.
    pub scheduling: SchedulingPolicy,

    /// Idle timeout of installed flow rules.
    #[serde(with = "humantime_serde")]
    pub flow_idle_timeout: Duration,

    /// Hard timeout of installed flow rules.
    #[serde(with = "humantime_serde")]
    pub flow_hard_timeout: Duration,

    /// Period between port statistics requests.
    #[serde(with = "humantime_serde")]
    pub stats_poll_interval: Duration,

    /// Address prefixes hosts are derived from.
    pub network: NetworkConfig,

    /// Client host range.
    pub clients: HostRangeConfig,

    /// Server host range.
    pub servers: HostRangeConfig,

    /// Virtual proxy identity.
    pub proxy: ProxyConfig,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            scheduling: SchedulingPolicy::default(),
            flow_idle_timeout: Duration::from_secs(10),
            flow_hard_timeout: Duration::from_secs(10),
            stats_poll_interval: Duration::from_secs(3),
            network: NetworkConfig::default(),
            clients: HostRangeConfig { start: 1, end: 6 },
            servers: HostRangeConfig { start: 7, end: 12 },
            proxy: ProxyConfig { suffix: 13 },
        }
    }
}

/// Backend scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingPolicy {
    /// Uniformly random server per flow.
    #[default]
    Random,
    /// Servers in pool order, starting after a random offset.
    RoundRobin,
}

impl std::fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::RoundRobin => write!(f, "round-robin"),
        }
    }
}

/// Address prefixes shared by every host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// First five link-address octets, colon separated hex.
    pub mac_prefix: String,

    /// First three network-address octets, dotted decimal.
    pub ip_prefix: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_prefix: "00:00:00:00:00".to_string(),
            ip_prefix: "10.0.0".to_string(),
        }
    }
}

impl NetworkConfig {
    /// Parses the link-address prefix.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the prefix is not five hex octets.
    pub fn mac_prefix_octets(&self) -> Result<[u8; 5], String> {
        let full = format!("{}:00", self.mac_prefix);
        let mac: MacAddr = full
            .parse()
            .map_err(|_| format!("'{}' is not five hex octets", self.mac_prefix))?;
        let o = mac.octets();
        Ok([o[0], o[1], o[2], o[3], o[4]])
    }

    /// Parses the network-address prefix.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the prefix is not three decimal octets.
    pub fn ip_prefix_octets(&self) -> Result<[u8; 3], String> {
        let invalid = || format!("'{}' is not three decimal octets", self.ip_prefix);
        let mut octets = [0u8; 3];
        let mut parts = self.ip_prefix.split('.');
        for octet in &mut octets {
            *octet = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(octets)
    }
}

/// Inclusive range of host suffixes forming one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRangeConfig {
    /// First suffix.
    pub start: u8,
    /// Last suffix (inclusive).
    pub end: u8,
}

impl HostRangeConfig {
    /// Suffixes in the range.
    #[must_use]
    pub fn suffixes(&self) -> RangeInclusive<u8> {
        self.start..=self.end
    }

    /// Returns `true` if `suffix` is in the range.
    #[must_use]
    pub fn contains(&self, suffix: u8) -> bool {
        self.suffixes().contains(&suffix)
    }

    /// Returns `true` if the two ranges share a suffix.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Virtual proxy identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Host suffix of the proxy addresses.
    pub suffix: u8,
}

impl BalancerConfig {
    /// Idle timeout in whole seconds, as carried by flow-mods.
    #[must_use]
    pub fn flow_idle_timeout_secs(&self) -> u16 {
        duration_secs_u16(self.flow_idle_timeout)
    }

    /// Hard timeout in whole seconds, as carried by flow-mods.
    #[must_use]
    pub fn flow_hard_timeout_secs(&self) -> u16 {
        duration_secs_u16(self.flow_hard_timeout)
    }

    /// Checks prefixes, pool ranges, pool disjointness and the proxy suffix.
    #[must_use]
    pub fn check_layout(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(message) = self.network.mac_prefix_octets() {
            result.add_error(ValidationError::error("balancer.network.mac_prefix", message));
        }
        if let Err(message) = self.network.ip_prefix_octets() {
            result.add_error(ValidationError::error("balancer.network.ip_prefix", message));
        }

        let pools = [("balancer.clients", &self.clients), ("balancer.servers", &self.servers)];
        for (field, range) in pools {
            if range.start > range.end {
                result.add_error(ValidationError::error(
                    field,
                    format!("empty pool: start {} is after end {}", range.start, range.end),
                ));
            }
            if range.start == 0 || range.end > MAX_HOST_SUFFIX {
                result.add_error(ValidationError::error(
                    field,
                    format!("suffixes must lie in 1..={MAX_HOST_SUFFIX}"),
                ));
            }
        }

        if self.clients.overlaps(&self.servers) {
            result.add_error(ValidationError::error(
                "balancer.servers",
                format!(
                    "server range {}..={} overlaps client range {}..={}",
                    self.servers.start, self.servers.end, self.clients.start, self.clients.end
                ),
            ));
        }

        let proxy = self.proxy.suffix;
        if proxy == 0 || proxy > MAX_HOST_SUFFIX {
            result.add_error(ValidationError::error(
                "balancer.proxy.suffix",
                format!("suffix must lie in 1..={MAX_HOST_SUFFIX}"),
            ));
        }
        if self.clients.contains(proxy) || self.servers.contains(proxy) {
            result.add_error(ValidationError::error(
                "balancer.proxy.suffix",
                format!("proxy suffix {proxy} collides with a pool member"),
            ));
        }

        result
    }

    /// Checks flow timeouts and the poll interval.
    #[must_use]
    pub fn check_timing(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (field, timeout) in [
            ("balancer.flow_idle_timeout", self.flow_idle_timeout),
            ("balancer.flow_hard_timeout", self.flow_hard_timeout),
        ] {
            if timeout.is_zero() || timeout.subsec_nanos() != 0 {
                result.add_error(ValidationError::error(
                    field,
                    "must be a non-zero whole number of seconds",
                ));
            } else if timeout.as_secs() > u64::from(u16::MAX) {
                result.add_error(ValidationError::error(
                    field,
                    format!("must not exceed {} seconds", u16::MAX),
                ));
            }
        }

        if self.stats_poll_interval.is_zero() {
            result.add_error(ValidationError::error(
                "balancer.stats_poll_interval",
                "must be non-zero",
            ));
        }

        if self.flow_idle_timeout > self.flow_hard_timeout {
            result.add_error(ValidationError::warning(
                "balancer.flow_idle_timeout",
                format!(
                    "idle timeout {}s never fires before the hard timeout {}s",
                    self.flow_idle_timeout.as_secs(),
                    self.flow_hard_timeout.as_secs()
                ),
            ));
        }

        result
    }
}

fn duration_secs_u16(duration: Duration) -> u16 {
    u16::try_from(duration.as_secs()).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BalancerConfig::default();
        assert_eq!(config.scheduling, SchedulingPolicy::Random);
        assert_eq!(config.flow_idle_timeout_secs(), 10);
        assert_eq!(config.flow_hard_timeout_secs(), 10);
        assert_eq!(config.stats_poll_interval, Duration::from_secs(3));
        assert!(config.check_layout().is_valid());
        assert!(config.check_timing().is_valid());
    }

    #[test]
    fn test_deserialize_config() {
        let toml = r#"
            scheduling = "round-robin"
            flow_idle_timeout = "30s"
            flow_hard_timeout = "1m"

            [servers]
            start = 20
            end = 29
        "#;

        let config: BalancerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.scheduling, SchedulingPolicy::RoundRobin);
        assert_eq!(config.flow_idle_timeout_secs(), 30);
        assert_eq!(config.flow_hard_timeout_secs(), 60);
        assert_eq!(config.servers, HostRangeConfig { start: 20, end: 29 });
        assert_eq!(config.clients, HostRangeConfig { start: 1, end: 6 });
    }

    #[test]
    fn test_prefix_parsing() {
        let network = NetworkConfig::default();
        assert_eq!(network.mac_prefix_octets().unwrap(), [0, 0, 0, 0, 0]);
        assert_eq!(network.ip_prefix_octets().unwrap(), [10, 0, 0]);

        let bad = NetworkConfig {
            mac_prefix: "00:00:00:00".to_string(),
            ip_prefix: "10.0.0.1".to_string(),
        };
        assert!(bad.mac_prefix_octets().is_err());
        assert!(bad.ip_prefix_octets().is_err());
    }

    #[test]
    fn test_range_overlap() {
        let a = HostRangeConfig { start: 1, end: 6 };
        let b = HostRangeConfig { start: 7, end: 12 };
        let c = HostRangeConfig { start: 6, end: 8 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_layout_rejects_empty_pool() {
        let config = BalancerConfig {
            servers: HostRangeConfig { start: 12, end: 7 },
            ..BalancerConfig::default()
        };
        let result = config.check_layout();
        assert!(!result.is_valid());
        assert!(result.summary().contains("empty pool"));
    }

    #[test]
    fn test_layout_rejects_proxy_collision() {
        let config = BalancerConfig {
            proxy: ProxyConfig { suffix: 9 },
            ..BalancerConfig::default()
        };
        let result = config.check_layout();
        assert!(!result.is_valid());
        assert!(result.summary().contains("collides"));
    }

    #[test]
    fn test_layout_rejects_large_suffix() {
        let config = BalancerConfig {
            servers: HostRangeConfig { start: 90, end: 120 },
            ..BalancerConfig::default()
        };
        assert!(!config.check_layout().is_valid());
    }

    #[test]
    fn test_timing_rejects_fractional_timeout() {
        let config = BalancerConfig {
            flow_idle_timeout: Duration::from_millis(1500),
            ..BalancerConfig::default()
        };
        assert!(!config.check_timing().is_valid());
    }

    #[test]
    fn test_timing_rejects_oversized_timeout() {
        let config = BalancerConfig {
            flow_hard_timeout: Duration::from_secs(70_000),
            ..BalancerConfig::default()
        };
        assert!(!config.check_timing().is_valid());
    }
}
