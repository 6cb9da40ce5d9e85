//! Worker configuration

use std::time::Duration;

use bytes::Bytes;

use crate::protocol::constants::*;

/// Worker configuration options
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Service this worker registers for
    pub service: String,

    /// Identity requested from the broker (empty = broker assigns)
    pub identity: Bytes,

    /// Interval between heartbeats sent to the broker
    pub heartbeat_interval: Duration,

    /// Silent poll intervals tolerated before reconnecting
    pub heartbeat_liveness: u32,

    /// Bounded wait per poll; also the liveness tick
    pub poll_timeout: Duration,

    /// Pause before reconnecting after the broker went quiet
    pub reconnect_delay: Duration,

    /// Largest frame sent or accepted
    pub max_frame_size: usize,
}

impl WorkerConfig {
    /// Create a config for a service with default timing
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            identity: Bytes::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_liveness: DEFAULT_WORKER_LIVENESS,
            poll_timeout: DEFAULT_RECV_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Request a specific identity
    pub fn identity(mut self, identity: impl Into<Bytes>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the liveness budget (at least 1)
    pub fn heartbeat_liveness(mut self, liveness: u32) -> Self {
        self.heartbeat_liveness = liveness.max(1);
        self
    }

    /// Set the poll timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the frame size limit
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}
