//! Worker runtime
//!
//! Connects to the broker, registers for a service, and then alternates
//! between handing requests to the caller and sending back replies. The
//! bounded poll inside [`MdpWorker::recv`] is the only suspension point and
//! also drives heartbeats and liveness:
//!
//! ```text
//!            ┌──────────── any message: liveness = max ───────────┐
//!            ▼                                                    │
//!   connect ──► poll(timeout) ──► REQUEST ──► return to caller    │
//!      ▲            │  │                                          │
//!      │            │  └── HEARTBEAT / unknown ───────────────────┘
//!      │            │
//!      │            └── timeout: liveness -= 1
//!      │                   │
//!      └── DISCONNECT ─────┴── liveness == 0: sleep, reconnect
//! ```

use bytes::Bytes;
use tokio::time::{sleep, timeout, Instant};

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::MDPW_WORKER;
use crate::protocol::{Address, Command, Envelope};
use crate::transport::DealerSocket;

use super::config::WorkerConfig;

/// What a message from the broker asks the worker to do
#[derive(Debug)]
enum Inbound {
    /// Request body, with the client address already captured
    Request(Envelope),
    Heartbeat,
    Disconnect,
    Ignored,
}

/// Majordomo worker
pub struct MdpWorker {
    config: WorkerConfig,
    endpoint: Option<String>,
    socket: Option<DealerSocket>,
    /// Silent polls left before reconnecting
    liveness: u32,
    heartbeat_at: Instant,
    /// Client address of the request being processed
    reply_to: Option<Address>,
    reconnects: u64,
}

impl MdpWorker {
    /// Create an unconnected worker
    pub fn new(config: WorkerConfig) -> Self {
        let liveness = config.heartbeat_liveness;
        Self {
            config,
            endpoint: None,
            socket: None,
            liveness,
            heartbeat_at: Instant::now(),
            reply_to: None,
            reconnects: 0,
        }
    }

    /// Connect to the broker and send READY
    ///
    /// May be called again to reconnect; the previous connection is dropped.
    pub async fn connect(&mut self, endpoint: impl Into<String>) -> Result<()> {
        self.endpoint = Some(endpoint.into());
        self.reconnect().await
    }

    async fn reconnect(&mut self) -> Result<()> {
        let endpoint = self.endpoint.clone().ok_or(Error::NotConnected)?;

        self.socket = None;
        self.liveness = self.config.heartbeat_liveness;
        self.heartbeat_at = Instant::now() + self.config.heartbeat_interval;

        let socket = DealerSocket::connect_with_limit(
            endpoint.as_str(),
            self.config.identity.clone(),
            self.config.max_frame_size,
        )
        .await?;
        self.socket = Some(socket);

        let service = Bytes::copy_from_slice(self.config.service.as_bytes());
        self.send_to_broker(Command::Ready, Some(service), None).await?;

        tracing::info!(broker = %endpoint, service = %self.config.service, "Worker connected");
        Ok(())
    }

    /// Reconnect, keeping the loop alive if the broker is unreachable
    async fn reconnect_or_wait(&mut self) {
        self.reconnects += 1;
        if let Err(e) = self.reconnect().await {
            self.socket = None;
            tracing::warn!(error = %e, "Reconnect failed, retrying after liveness expires");
        }
    }

    /// Send `[""][MDPW01][command][option?][message...]`
    async fn send_to_broker(
        &mut self,
        command: Command,
        option: Option<Bytes>,
        message: Option<Envelope>,
    ) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;

        let mut message = message.unwrap_or_default();
        if let Some(option) = option {
            message.push_front(option);
        }
        message.push_front(command.to_frame());
        message.push_front(Bytes::from_static(MDPW_WORKER));
        message.push_front(Bytes::new());

        if command != Command::Heartbeat {
            tracing::debug!(command = %command, "Sending to broker");
        }

        socket.send(message).await
    }

    /// Send the previous reply, if any, and wait for the next request
    ///
    /// Returns the request body. Heartbeats, broker silence and DISCONNECT
    /// are handled internally; this only returns an error for misuse
    /// (never connected, replying with no request outstanding).
    pub async fn recv(&mut self, reply: Option<Envelope>) -> Result<Envelope> {
        if self.endpoint.is_none() {
            return Err(Error::NotConnected);
        }

        if let Some(mut reply) = reply {
            let reply_to = self.reply_to.take().ok_or(ProtocolError::NoPendingRequest)?;
            reply.wrap(reply_to.to_frame(), true);
            match self.send_to_broker(Command::Reply, None, Some(reply)).await {
                Ok(()) => {}
                Err(Error::Protocol(e)) => {
                    tracing::warn!(client = %reply_to, error = %e, "Reply refused");
                }
                Err(e) => {
                    tracing::warn!(client = %reply_to, error = %e, "Reply lost");
                    self.socket = None;
                }
            }
        }

        loop {
            let polled = match self.socket.as_mut() {
                Some(socket) => timeout(self.config.poll_timeout, socket.recv()).await.ok(),
                None => {
                    sleep(self.config.poll_timeout).await;
                    None
                }
            };

            match polled {
                Some(Ok(message)) => {
                    self.liveness = self.config.heartbeat_liveness;
                    match self.process(message) {
                        Inbound::Request(body) => return Ok(body),
                        Inbound::Disconnect => {
                            tracing::info!("Broker requested reconnect");
                            self.reconnect_or_wait().await;
                        }
                        Inbound::Heartbeat | Inbound::Ignored => {}
                    }
                }
                Some(Err(Error::Protocol(e))) => {
                    tracing::warn!(error = %e, "Discarding message from broker");
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Lost connection to broker");
                    sleep(self.config.reconnect_delay).await;
                    self.reconnect_or_wait().await;
                }
                None => {
                    self.liveness = self.liveness.saturating_sub(1);
                    if self.liveness == 0 {
                        tracing::warn!("Broker silent, reconnecting");
                        sleep(self.config.reconnect_delay).await;
                        self.reconnect_or_wait().await;
                    }
                }
            }

            if self.socket.is_some() && Instant::now() > self.heartbeat_at {
                if let Err(e) = self.send_to_broker(Command::Heartbeat, None, None).await {
                    tracing::warn!(error = %e, "Heartbeat failed");
                    self.socket = None;
                }
                self.heartbeat_at = Instant::now() + self.config.heartbeat_interval;
            }
        }
    }

    /// Classify `[""][MDPW01][command][...]` from the broker
    fn process(&mut self, message: Envelope) -> Inbound {
        let (command, mut message) = match parse_broker_message(message) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring message from broker");
                return Inbound::Ignored;
            }
        };

        match command {
            Command::Request => match message.unwrap() {
                Ok(client) => {
                    tracing::debug!(client = %client, frames = message.frame_count(), "Received request");
                    self.reply_to = Some(client);
                    Inbound::Request(message)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "REQUEST without a client address");
                    Inbound::Ignored
                }
            },
            Command::Heartbeat => Inbound::Heartbeat,
            Command::Disconnect => Inbound::Disconnect,
            other => {
                tracing::warn!(command = %other, "Unexpected command from broker");
                Inbound::Ignored
            }
        }
    }

    /// Service this worker serves
    pub fn service(&self) -> &str {
        &self.config.service
    }

    /// Whether a broker connection is open
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Silent polls left before reconnecting
    pub fn liveness(&self) -> u32 {
        self.liveness
    }

    /// Reconnects performed after the initial connect
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }
}

/// Strip `[""][MDPW01][command]`, leaving the command's payload
fn parse_broker_message(mut message: Envelope) -> Result<(Command, Envelope)> {
    let _delimiter = message.pop_front()?;
    let header = message.pop_front()?;
    if header != MDPW_WORKER {
        return Err(ProtocolError::InvalidHeader(header).into());
    }
    let command = Command::from_frame(&message.pop_front()?)?;
    Ok((command, message))
}
