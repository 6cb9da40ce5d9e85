//! Per-service state

use std::collections::{HashSet, VecDeque};

use crate::protocol::{Address, Envelope};

use super::queue::ReadyWorkerQueue;

/// Entry for a single service in the registry
#[derive(Debug)]
pub struct ServiceEntry {
    /// Service name
    pub name: String,

    /// Workers bound to this service, idle or busy
    pub(super) workers: HashSet<Address>,

    /// Client requests waiting for a worker, oldest first
    pub(super) requests: VecDeque<Envelope>,

    /// Idle workers, earliest expiry first
    pub(super) waiting: ReadyWorkerQueue,
}

impl ServiceEntry {
    pub(super) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workers: HashSet::new(),
            requests: VecDeque::new(),
            waiting: ReadyWorkerQueue::new(),
        }
    }

    /// Number of bound workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether any worker is bound
    pub fn has_workers(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Number of idle workers
    pub fn idle_count(&self) -> usize {
        self.waiting.len()
    }

    /// Number of queued requests
    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }

    /// Whether a worker is currently idle in this service
    pub fn is_idle(&self, address: &Address) -> bool {
        self.waiting.contains(address)
    }
}

/// Snapshot of one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub name: String,
    pub workers: usize,
    pub idle_workers: usize,
    pub pending_requests: usize,
}

impl From<&ServiceEntry> for ServiceStats {
    fn from(entry: &ServiceEntry) -> Self {
        Self {
            name: entry.name.clone(),
            workers: entry.worker_count(),
            idle_workers: entry.idle_count(),
            pending_requests: entry.pending_count(),
        }
    }
}
