//! The module lifecycle trait.

use super::{ModuleConfig, ModuleResult, ModuleStatus};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Metrics payload containing module-specific metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsPayload {
    /// Counter metrics (monotonically increasing).
    pub counters: BTreeMap<String, u64>,

    /// Gauge metrics (can go up and down).
    pub gauges: BTreeMap<String, f64>,
}

impl MetricsPayload {
    /// Creates a new empty metrics payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a counter metric.
    pub fn counter(&mut self, name: impl Into<String>, value: u64) {
        self.counters.insert(name.into(), value);
    }

    /// Adds a gauge metric.
    pub fn gauge(&mut self, name: impl Into<String>, value: f64) {
        self.gauges.insert(name.into(), value);
    }

    /// Formats metrics in Prometheus text format, sorted by name.
    #[must_use]
    pub fn to_prometheus(&self, prefix: &str) -> String {
        let mut output = String::new();

        for (name, value) in &self.counters {
            let _ = writeln!(output, "{prefix}_{name} {value}");
        }

        for (name, value) in &self.gauges {
            let _ = writeln!(output, "{prefix}_{name} {value}");
        }

        output
    }
}

/// Lifecycle contract for controller components.
///
/// # Lifecycle
///
/// 1. `init()` - Apply configuration
/// 2. `start()` - Begin processing
/// 3. `status()` / `metrics()` - Ongoing monitoring
/// 4. `stop()` - Release every resource the module holds
pub trait ModuleContract: Send {
    /// Stable module name used in logs and metric prefixes.
    fn name(&self) -> &'static str;

    /// Applies configuration. Must not start processing.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::ConfigError` if the configuration is invalid.
    fn init(&mut self, config: ModuleConfig) -> ModuleResult<()>;

    /// Starts processing.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::InvalidState` if the module is already running.
    fn start(&mut self) -> ModuleResult<()>;

    /// Stops processing and releases resources.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::InvalidState` if the module is not running.
    fn stop(&mut self) -> ModuleResult<()>;

    /// Returns the current status of the module.
    fn status(&self) -> ModuleStatus;

    /// Returns the current metrics from the module.
    fn metrics(&self) -> MetricsPayload;

    /// Liveness check. Defaults to "status is healthy".
    fn heartbeat(&self) -> bool {
        self.status().is_healthy()
    }
}
