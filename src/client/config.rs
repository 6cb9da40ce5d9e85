//! Client configuration

use std::time::Duration;

use bytes::Bytes;

use crate::protocol::constants::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_RECV_TIMEOUT};

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long `recv` waits for a reply before giving up
    pub timeout: Duration,

    /// Identity requested from the broker (empty = broker assigns)
    pub identity: Bytes,

    /// Largest frame sent or accepted
    pub max_frame_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RECV_TIMEOUT,
            identity: Bytes::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ClientConfig {
    /// Set the receive timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Request a specific identity
    pub fn identity(mut self, identity: impl Into<Bytes>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Set the frame size limit
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}
