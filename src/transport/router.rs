//! Router socket
//!
//! Accepts dealer connections and multiplexes them onto one receive queue.
//! Every inbound message is delivered with the sender's identity as frame 0;
//! every outbound message is routed by popping frame 0.
//!
//! ```text
//!   dealer A ──► [reader task] ─┐
//!   dealer B ──► [reader task] ─┼──► events ──► RouterSocket::recv()
//!   dealer C ──► [reader task] ─┘
//!
//!   RouterSocket::send() ──► peers[identity] ──► [writer task] ──► dealer
//! ```
//!
//! The peer table is owned by the socket and only touched from `recv` and
//! `send`, so the caller's loop stays the single owner of routing state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::address::Address;
use crate::protocol::constants::{DEFAULT_MAX_FRAME_SIZE, IDENTITY_LEN};
use crate::protocol::Envelope;
use crate::transport::codec::{self, FrameCodec};

/// Outbound messages buffered per peer before new ones are dropped
pub const PEER_QUEUE_CAPACITY: usize = 1000;

/// Inbound events buffered before reader tasks apply backpressure
const EVENT_QUEUE_CAPACITY: usize = 4096;

/// A peer must send its greeting within this time
const GREETING_TIMEOUT: Duration = Duration::from_secs(10);

enum PeerEvent {
    Connected {
        conn_id: u64,
        identity: Bytes,
        tx: mpsc::Sender<Vec<Bytes>>,
    },
    Message {
        identity: Bytes,
        frames: Vec<Bytes>,
    },
    Disconnected {
        conn_id: u64,
        identity: Bytes,
    },
}

struct Peer {
    conn_id: u64,
    tx: mpsc::Sender<Vec<Bytes>>,
}

/// Identity-addressed server socket
pub struct RouterSocket {
    local_addr: SocketAddr,
    max_frame_size: usize,
    events: mpsc::Receiver<PeerEvent>,
    peers: HashMap<Bytes, Peer>,
    accept_task: JoinHandle<()>,
}

impl RouterSocket {
    /// Bind with the default frame size limit
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::bind_with_limit(addr, DEFAULT_MAX_FRAME_SIZE).await
    }

    /// Bind with a custom frame size limit
    pub async fn bind_with_limit<A: ToSocketAddrs>(addr: A, max_frame_size: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (events_tx, events) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let accept_task = tokio::spawn(accept_loop(listener, events_tx, max_frame_size));

        Ok(Self {
            local_addr,
            max_frame_size,
            events,
            peers: HashMap::new(),
            accept_task,
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connected peers seen by `recv` so far
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Receive the next message, sender identity first
    ///
    /// Cancel-safe, so it can be raced against a timeout.
    pub async fn recv(&mut self) -> Result<Envelope> {
        loop {
            let event = self.events.recv().await.ok_or(Error::ConnectionClosed)?;

            match event {
                PeerEvent::Connected {
                    conn_id,
                    identity,
                    tx,
                } => {
                    let peer = Peer { conn_id, tx };
                    if self.peers.insert(identity.clone(), peer).is_some() {
                        tracing::debug!(peer = %Address::new(identity), "Identity taken over by new connection");
                    }
                }
                PeerEvent::Message { identity, frames } => {
                    let mut envelope = Envelope::from(frames);
                    envelope.push_front(identity);
                    return Ok(envelope);
                }
                PeerEvent::Disconnected { conn_id, identity } => {
                    if self.peers.get(&identity).is_some_and(|p| p.conn_id == conn_id) {
                        self.peers.remove(&identity);
                        tracing::debug!(peer = %Address::new(identity), "Peer disconnected");
                    }
                }
            }
        }
    }

    /// Route a message to the peer named by its first frame
    ///
    /// Messages for unknown peers are dropped, as are messages for peers
    /// whose outbound queue is full. A message with a frame over the size
    /// limit is refused with `FrameTooLarge`.
    pub fn send(&mut self, mut envelope: Envelope) -> Result<()> {
        let identity = envelope.pop_front()?;
        let frames = envelope.into_frames();
        codec::check_frame_sizes(&frames, self.max_frame_size)?;

        let Some(peer) = self.peers.get(&identity) else {
            tracing::debug!(peer = %Address::new(identity), "Dropping message for unknown peer");
            return Ok(());
        };

        match peer.tx.try_send(frames) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(peer = %Address::new(identity), "Peer queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.peers.remove(&identity);
                tracing::debug!(peer = %Address::new(identity), "Peer writer closed");
            }
        }

        Ok(())
    }
}

impl Drop for RouterSocket {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    events: mpsc::Sender<PeerEvent>,
    max_frame_size: usize,
) {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut next_conn_id: u64 = 0;

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                next_conn_id += 1;
                let identity = generate_identity(seed, next_conn_id);
                tokio::spawn(run_peer(
                    stream,
                    peer_addr,
                    next_conn_id,
                    identity,
                    events.clone(),
                    max_frame_size,
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept connection");
            }
        }

        if events.is_closed() {
            break;
        }
    }
}

/// `[0][seed: u64 BE][conn_id: u64 BE]`
fn generate_identity(seed: u64, conn_id: u64) -> Bytes {
    let mut id = BytesMut::with_capacity(IDENTITY_LEN);
    id.extend_from_slice(&[0]);
    id.extend_from_slice(&seed.to_be_bytes());
    id.extend_from_slice(&conn_id.to_be_bytes());
    id.freeze()
}

async fn run_peer(
    stream: TcpStream,
    peer_addr: SocketAddr,
    conn_id: u64,
    generated: Bytes,
    events: mpsc::Sender<PeerEvent>,
    max_frame_size: usize,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
    }

    let (mut reader, mut writer) = stream.into_split();
    let mut buf = BytesMut::with_capacity(8 * 1024);
    let mut codec = FrameCodec::with_max_frame_size(max_frame_size);

    let greeting = tokio::time::timeout(
        GREETING_TIMEOUT,
        codec::read_message(&mut reader, &mut buf, &mut codec),
    )
    .await;
    let identity = match greeting {
        Ok(Ok(frames)) => match frames.into_iter().next() {
            Some(requested) if !requested.is_empty() => requested,
            _ => generated,
        },
        Ok(Err(e)) => {
            tracing::debug!(peer = %peer_addr, error = %e, "Greeting failed");
            return;
        }
        Err(_) => {
            tracing::debug!(peer = %peer_addr, "Greeting timed out");
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<Vec<Bytes>>(PEER_QUEUE_CAPACITY);
    let connected = PeerEvent::Connected {
        conn_id,
        identity: identity.clone(),
        tx,
    };
    if events.send(connected).await.is_err() {
        return;
    }

    tracing::debug!(peer = %peer_addr, identity = %Address::new(identity.clone()), "Peer connected");

    let write_codec = FrameCodec::with_max_frame_size(max_frame_size);
    let writer_task = tokio::spawn(async move {
        while let Some(frames) = rx.recv().await {
            if let Err(e) = codec::write_message(&mut writer, &write_codec, &frames).await {
                tracing::debug!(error = %e, "Peer write failed");
                break;
            }
        }
    });

    loop {
        match codec::read_message(&mut reader, &mut buf, &mut codec).await {
            Ok(frames) => {
                let message = PeerEvent::Message {
                    identity: identity.clone(),
                    frames,
                };
                if events.send(message).await.is_err() {
                    break;
                }
            }
            Err(Error::ConnectionClosed) => break,
            Err(Error::Protocol(e)) => {
                tracing::warn!(peer = %peer_addr, error = %e, "Discarding inbound message");
            }
            Err(e) => {
                tracing::debug!(peer = %peer_addr, error = %e, "Peer read failed");
                break;
            }
        }
    }

    writer_task.abort();
    let _ = events.send(PeerEvent::Disconnected { conn_id, identity }).await;
}
