//! Broker socket loop
//!
//! Binds the router socket and drives the [`Broker`] engine from a single
//! loop. The bounded receive doubles as the heartbeat clock.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::Result;
use crate::server::broker::Broker;
use crate::server::config::BrokerConfig;
use crate::transport::RouterSocket;

/// Majordomo broker bound to a socket
pub struct MdpBroker {
    config: BrokerConfig,
    socket: RouterSocket,
    broker: Broker,
}

impl MdpBroker {
    /// Bind the router socket
    ///
    /// Fails if the address is unavailable; nothing can proceed without it.
    pub async fn bind(config: BrokerConfig) -> Result<Self> {
        let socket = RouterSocket::bind_with_limit(config.bind_addr, config.max_frame_size).await?;
        let broker = Broker::new(&config, Instant::now());

        tracing::info!(
            addr = %socket.local_addr(),
            heartbeat_ms = config.heartbeat_interval.as_millis() as u64,
            liveness = config.heartbeat_liveness,
            "Broker listening"
        );

        Ok(Self {
            config,
            socket,
            broker,
        })
    }

    /// Address the broker is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }

    /// Broker configuration
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Routing engine
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Run the broker loop
    ///
    /// Only returns if the socket fails.
    pub async fn listen(&mut self) -> Result<()> {
        loop {
            self.step().await?;
        }
    }

    /// Run the broker loop until `shutdown` resolves
    pub async fn listen_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    return Ok(());
                }
                result = self.step() => result?,
            }
        }
    }

    /// One loop iteration: wait for a message or the heartbeat deadline
    ///
    /// The only suspension point is the socket receive, which is
    /// cancel-safe, so a step can be abandoned by `listen_until`.
    async fn step(&mut self) -> Result<()> {
        let wait = self.broker.time_until_heartbeat(Instant::now());

        if let Ok(received) = tokio::time::timeout(wait, self.socket.recv()).await {
            self.broker.handle_message(received?, Instant::now());
        }

        self.broker.on_tick(Instant::now());
        self.flush();

        let registry = self.broker.registry();
        tracing::debug!(
            workers = self.broker.worker_count(),
            services = registry.len(),
            idle = registry.idle_workers(),
            pending = registry.pending_requests(),
            "Stats"
        );

        Ok(())
    }

    fn flush(&mut self) {
        for message in self.broker.drain_outbox() {
            if let Err(e) = self.socket.send(message) {
                tracing::warn!(error = %e, "Failed to route message");
            }
        }
    }
}
