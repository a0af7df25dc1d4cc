//! Controller-wide counters.

use crate::module::MetricsPayload;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the controller and its sessions.
#[derive(Debug, Default)]
pub struct BalancerStats {
    /// ARP replies sent.
    pub arp_replies: AtomicU64,
    /// Client flows bound to a server.
    pub flows_admitted: AtomicU64,
    /// Server packets rewritten and forwarded to a client.
    pub passthrough_forwarded: AtomicU64,
    /// Packets dropped (unknown client, undecodable frame).
    pub packets_dropped: AtomicU64,
    /// Packets with nothing to do (foreign ether-type, non-request ARP).
    pub packets_ignored: AtomicU64,
    /// Port statistics requests sent.
    pub stats_requests_sent: AtomicU64,
    /// Port statistics replies received.
    pub stats_replies_received: AtomicU64,
    /// Messages the transport refused.
    pub send_failures: AtomicU64,
}

impl BalancerStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_arp_reply(&self) {
        self.arp_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flow_admitted(&self) {
        self.flows_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_passthrough(&self) {
        self.passthrough_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.packets_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stats_request(&self) {
        self.stats_requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stats_reply(&self) {
        self.stats_replies_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Port statistics requests sent so far.
    #[must_use]
    pub fn stats_requests(&self) -> u64 {
        self.stats_requests_sent.load(Ordering::Relaxed)
    }

    /// Writes every counter into `payload`.
    pub fn fill(&self, payload: &mut MetricsPayload) {
        let counters = [
            ("arp_replies_total", &self.arp_replies),
            ("flows_admitted_total", &self.flows_admitted),
            ("passthrough_forwarded_total", &self.passthrough_forwarded),
            ("packets_dropped_total", &self.packets_dropped),
            ("packets_ignored_total", &self.packets_ignored),
            ("stats_requests_sent_total", &self.stats_requests_sent),
            ("stats_replies_received_total", &self.stats_replies_received),
            ("send_failures_total", &self.send_failures),
        ];
        for (name, value) in counters {
            payload.counter(name, value.load(Ordering::Relaxed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_metrics() {
        let stats = BalancerStats::new();
        stats.record_arp_reply();
        stats.record_arp_reply();
        stats.record_flow_admitted();
        stats.record_stats_request();

        let mut payload = MetricsPayload::new();
        stats.fill(&mut payload);
        assert_eq!(payload.counters["arp_replies_total"], 2);
        assert_eq!(payload.counters["flows_admitted_total"], 1);
        assert_eq!(payload.counters["send_failures_total"], 0);
        assert_eq!(stats.stats_requests(), 1);
    }
}
