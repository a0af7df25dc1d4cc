//! Configuration type definitions.

use crate::modules::proxy_balancer::BalancerConfig;
use serde::{Deserialize, Serialize};

/// Root configuration structure for the controller process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ControllerConfig {
    /// Controller identity.
    pub controller: ControllerSection,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Host layout, scheduling and timing of the balancer core.
    pub balancer: BalancerConfig,
}

/// Controller identity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Instance name, attached to log output.
    pub name: String,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            name: "proxy-balancer".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub level: LogLevel,

    /// Log format (json, pretty, compact).
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level (least verbose).
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable).
    Json,
    /// Multi-line human-readable format (default).
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::proxy_balancer::SchedulingPolicy;
    use std::time::Duration;

    #[test]
    fn test_default_controller_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.controller.name, "proxy-balancer");
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.balancer.scheduling, SchedulingPolicy::Random);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ControllerConfig = toml::from_str(
            r#"
            [controller]
            name = "lab-switch"
        "#,
        )
        .unwrap();
        assert_eq!(config.controller.name, "lab-switch");
        assert_eq!(config.balancer.servers.start, 7);
    }

    #[test]
    fn test_parse_full_config() {
        let config: ControllerConfig = toml::from_str(
            r#"
            [controller]
            name = "full"

            [logging]
            level = "debug"
            format = "json"

            [balancer]
            scheduling = "round-robin"
            stats_poll_interval = "5s"

            [balancer.network]
            mac_prefix = "02:00:00:00:00"
            ip_prefix = "192.168.10"

            [balancer.clients]
            start = 10
            end = 19

            [balancer.servers]
            start = 20
            end = 23

            [balancer.proxy]
            suffix = 50
        "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.balancer.scheduling, SchedulingPolicy::RoundRobin);
        assert_eq!(config.balancer.stats_poll_interval, Duration::from_secs(5));
        assert_eq!(config.balancer.network.ip_prefix, "192.168.10");
        assert_eq!(config.balancer.clients.end, 19);
        assert_eq!(config.balancer.proxy.suffix, 50);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }
}
