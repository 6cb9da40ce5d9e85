//! Statistics and counters for the broker

use crate::registry::ServiceStats;

/// Monotonic counters maintained by the broker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerCounters {
    /// Requests handed to a worker
    pub requests_dispatched: u64,
    /// Replies routed back to a client
    pub replies_routed: u64,
    /// Workers removed because their expiry passed
    pub workers_purged: u64,
    /// Messages rejected as protocol violations
    pub protocol_violations: u64,
    /// Heartbeat rounds sent
    pub heartbeats_sent: u64,
}

/// Point-in-time broker snapshot
#[derive(Debug, Clone, Default)]
pub struct BrokerStats {
    /// Known workers
    pub workers: usize,
    /// Known services
    pub services: usize,
    /// Idle workers across all services
    pub idle_workers: usize,
    /// Requests waiting for a worker
    pub pending_requests: usize,
    /// Lifetime counters
    pub counters: BrokerCounters,
    /// Per-service breakdown
    pub per_service: Vec<ServiceStats>,
}

impl BrokerStats {
    /// Workers currently holding a request
    pub fn busy_workers(&self) -> usize {
        self.workers.saturating_sub(self.idle_workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stats() {
        let stats = BrokerStats::default();
        assert_eq!(stats.workers, 0);
        assert_eq!(stats.counters, BrokerCounters::default());
        assert!(stats.per_service.is_empty());
    }

    #[test]
    fn test_busy_workers() {
        let stats = BrokerStats {
            workers: 5,
            idle_workers: 2,
            ..Default::default()
        };
        assert_eq!(stats.busy_workers(), 3);
    }
}
