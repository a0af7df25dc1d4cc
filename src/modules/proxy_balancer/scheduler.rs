//! Backend scheduling strategies.

use super::config::SchedulingPolicy;
use super::host::{Host, HostPool};
use std::sync::Arc;

/// Trait for server selection strategies.
///
/// `select_index` is only called with a non-empty pool and must return an
/// index below `pool_len`.
pub trait Strategy: Send + std::fmt::Debug {
    /// Picks the index of the next server.
    fn select_index(&mut self, pool_len: usize) -> usize;

    /// Get the strategy name.
    fn name(&self) -> &'static str;
}

/// Uniformly random selection.
#[derive(Debug, Default)]
pub struct RandomStrategy;

impl RandomStrategy {
    /// Create a new random strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for RandomStrategy {
    fn select_index(&mut self, pool_len: usize) -> usize {
        rand::RngExt::random_range(&mut rand::rng(), 0..pool_len)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Round-robin selection.
///
/// The cursor advances before each pick, so a strategy created with cursor
/// `c` first returns `c + 1`.
#[derive(Debug)]
pub struct RoundRobinStrategy {
    cursor: usize,
}

impl RoundRobinStrategy {
    /// Create a strategy whose cursor starts at a random pool position.
    #[must_use]
    pub fn new(pool_len: usize) -> Self {
        let cursor = if pool_len == 0 {
            0
        } else {
            rand::RngExt::random_range(&mut rand::rng(), 0..pool_len)
        };
        Self::with_cursor(cursor)
    }

    /// Create a strategy with a fixed starting cursor.
    #[must_use]
    pub fn with_cursor(cursor: usize) -> Self {
        Self { cursor }
    }

    /// Index of the most recently selected server.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Strategy for RoundRobinStrategy {
    fn select_index(&mut self, pool_len: usize) -> usize {
        self.cursor = (self.cursor + 1) % pool_len;
        self.cursor
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Per-session scheduler: a strategy plus request accounting.
#[derive(Debug)]
pub struct Scheduler {
    policy: SchedulingPolicy,
    strategy: Box<dyn Strategy>,
}

impl Scheduler {
    /// Create the scheduler for `policy`, seeded against `servers`.
    #[must_use]
    pub fn new(policy: SchedulingPolicy, servers: &HostPool) -> Self {
        let strategy: Box<dyn Strategy> = match policy {
            SchedulingPolicy::Random => Box::new(RandomStrategy::new()),
            SchedulingPolicy::RoundRobin => Box::new(RoundRobinStrategy::new(servers.len())),
        };
        Self { policy, strategy }
    }

    /// Create a scheduler around an explicit strategy.
    #[must_use]
    pub fn with_strategy(policy: SchedulingPolicy, strategy: Box<dyn Strategy>) -> Self {
        Self { policy, strategy }
    }

    /// The configured policy.
    #[must_use]
    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// Name of the active strategy.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Selects the next server and records the assignment on it.
    ///
    /// Returns `None` only for an empty pool.
    pub fn select_server(&mut self, servers: &HostPool) -> Option<Arc<Host>> {
        if servers.is_empty() {
            return None;
        }
        let index = self.strategy.select_index(servers.len()) % servers.len();
        let server = servers.get(index).map(Arc::clone)?;
        server.record_request();
        Some(server)
    }
}
