//! Dealer socket
//!
//! One TCP connection to a router. Whole multi-frame messages go out and
//! come back; the router adds and strips the peer identity on its side.

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::constants::DEFAULT_MAX_FRAME_SIZE;
use crate::protocol::Envelope;
use crate::transport::codec::{self, FrameCodec};

/// Client side of a router connection
#[derive(Debug)]
pub struct DealerSocket {
    stream: TcpStream,
    peer_addr: SocketAddr,
    read_buf: BytesMut,
    codec: FrameCodec,
}

impl DealerSocket {
    /// Connect and let the router assign an identity
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::connect_with_identity(addr, Bytes::new()).await
    }

    /// Connect and request a specific identity
    ///
    /// An empty identity means the router picks one.
    pub async fn connect_with_identity<A: ToSocketAddrs>(addr: A, identity: Bytes) -> Result<Self> {
        Self::connect_with_limit(addr, identity, DEFAULT_MAX_FRAME_SIZE).await
    }

    /// Connect with a requested identity and a custom frame size limit
    ///
    /// The limit applies both ways: larger inbound frames are skipped and
    /// larger outbound frames are refused.
    pub async fn connect_with_limit<A: ToSocketAddrs>(
        addr: A,
        identity: Bytes,
        max_frame_size: usize,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;

        let mut socket = Self {
            stream,
            peer_addr,
            read_buf: BytesMut::with_capacity(8 * 1024),
            codec: FrameCodec::with_max_frame_size(max_frame_size),
        };

        codec::write_message(&mut socket.stream, &socket.codec, &[identity]).await?;

        tracing::debug!(peer = %peer_addr, "Dealer connected");
        Ok(socket)
    }

    /// Send one message
    ///
    /// A frame over the size limit fails the send before anything is
    /// written, so the connection stays usable.
    pub async fn send(&mut self, envelope: Envelope) -> Result<()> {
        let frames = envelope.into_frames();
        codec::write_message(&mut self.stream, &self.codec, &frames).await
    }

    /// Receive one message
    ///
    /// Cancel-safe, so it can be raced against a timeout. A `FrameTooLarge`
    /// error drops only the offending message.
    pub async fn recv(&mut self) -> Result<Envelope> {
        let frames = codec::read_message(&mut self.stream, &mut self.read_buf, &mut self.codec).await?;
        Ok(Envelope::from(frames))
    }

    /// Address of the router
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
