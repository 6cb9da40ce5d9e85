//! Broker-side worker record

use std::time::{Duration, Instant};

use crate::protocol::Address;

/// A worker known to the broker
#[derive(Debug, Clone)]
pub struct WorkerEntry {
    /// Router identity of the worker
    pub address: Address,

    /// Service bound on the first READY
    pub service: Option<String>,

    /// After this instant the worker is considered dead
    pub expires_at: Instant,
}

impl WorkerEntry {
    /// Create a record that expires `expiry` after `now`
    pub fn new(address: Address, now: Instant, expiry: Duration) -> Self {
        Self {
            address,
            service: None,
            expires_at: now + expiry,
        }
    }

    /// Push the expiry out to `now + expiry`
    pub fn refresh(&mut self, now: Instant, expiry: Duration) {
        self.expires_at = now + expiry;
    }

    /// Whether the expiry has passed
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}
