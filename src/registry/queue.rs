//! Idle-worker priority queue
//!
//! Orders idle workers by ascending expiry, so the worker that has gone
//! longest without being marked ready is dispatched first. Equal expiries
//! fall back to insertion order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

use crate::protocol::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedWorker {
    expires_at: Instant,
    seq: u64,
    address: Address,
}

// Reversed so the max-heap yields the earliest expiry first
impl Ord for QueuedWorker {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .expires_at
            .cmp(&self.expires_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedWorker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Idle workers of one service, earliest expiry first
#[derive(Debug, Default)]
pub struct ReadyWorkerQueue {
    heap: BinaryHeap<QueuedWorker>,
    /// Membership index so `remove` can skip the heap scan
    members: HashSet<Address>,
    next_seq: u64,
}

impl ReadyWorkerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a worker
    ///
    /// A worker already queued is re-positioned rather than duplicated.
    pub fn insert(&mut self, address: Address, expires_at: Instant) {
        self.remove(&address);

        let seq = self.next_seq;
        self.next_seq += 1;

        self.members.insert(address.clone());
        self.heap.push(QueuedWorker {
            expires_at,
            seq,
            address,
        });
    }

    /// Remove and return the worker with the earliest expiry
    pub fn extract_min(&mut self) -> Option<Address> {
        let entry = self.heap.pop()?;
        self.members.remove(&entry.address);
        Some(entry.address)
    }

    /// Worker with the earliest expiry, without removing it
    pub fn peek_min(&self) -> Option<&Address> {
        self.heap.peek().map(|entry| &entry.address)
    }

    /// Remove a worker by identity
    ///
    /// Returns false if the worker was not queued.
    pub fn remove(&mut self, address: &Address) -> bool {
        if !self.members.remove(address) {
            return false;
        }
        self.heap.retain(|entry| &entry.address != address);
        true
    }

    /// Whether a worker is queued
    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    /// Number of idle workers
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no worker is idle
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
