//! Broker configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::*;

/// Broker configuration options
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Interval between heartbeat rounds; also the poll timeout
    pub heartbeat_interval: Duration,

    /// Heartbeat intervals a worker may miss before it is purged
    pub heartbeat_liveness: u32,

    /// Largest accepted frame in bytes
    pub max_frame_size: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5555)),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_liveness: DEFAULT_BROKER_LIVENESS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl BrokerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the heartbeat liveness (at least 1)
    pub fn heartbeat_liveness(mut self, liveness: u32) -> Self {
        self.heartbeat_liveness = liveness.max(1);
        self
    }

    /// Set the maximum frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Time without traffic after which a worker is dead
    pub fn heartbeat_expiry(&self) -> Duration {
        self.heartbeat_interval * self.heartbeat_liveness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();

        assert_eq!(config.bind_addr.port(), 5555);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(2500));
        assert_eq!(config.heartbeat_liveness, 3);
        assert_eq!(config.heartbeat_expiry(), Duration::from_millis(7500));
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:5556".parse().unwrap();
        let config = BrokerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_liveness_floor() {
        let config = BrokerConfig::default().heartbeat_liveness(0);

        assert_eq!(config.heartbeat_liveness, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config = BrokerConfig::default()
            .bind(addr)
            .heartbeat_interval(Duration::from_millis(100))
            .heartbeat_liveness(4)
            .max_frame_size(1024);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.heartbeat_expiry(), Duration::from_millis(400));
        assert_eq!(config.max_frame_size, 1024);
    }
}
