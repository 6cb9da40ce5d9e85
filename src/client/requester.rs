//! Majordomo client
//!
//! Thin send/receive facade. No heartbeating; a caller may pipeline many
//! sends before receiving, and replies can arrive in any order.

use bytes::Bytes;
use tokio::time::{timeout_at, Instant};

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::MDPC_CLIENT;
use crate::protocol::Envelope;
use crate::transport::DealerSocket;

use super::config::ClientConfig;

/// Majordomo client
///
/// # Example
/// ```no_run
/// use mdp_rs::client::{ClientConfig, MdpClient};
/// use mdp_rs::protocol::Envelope;
///
/// # async fn example() -> mdp_rs::error::Result<()> {
/// let mut client = MdpClient::new(ClientConfig::default());
/// client.connect("127.0.0.1:5555").await?;
///
/// client.send("echo", Envelope::with_body("Hello World")).await?;
/// if let Some(reply) = client.recv().await? {
///     println!("{:?}", reply.body()?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct MdpClient {
    config: ClientConfig,
    socket: Option<DealerSocket>,
}

impl MdpClient {
    /// Create an unconnected client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            socket: None,
        }
    }

    /// Connect to the broker, replacing any previous connection
    pub async fn connect(&mut self, endpoint: impl AsRef<str>) -> Result<()> {
        self.socket = None;
        let endpoint = endpoint.as_ref();
        let socket = DealerSocket::connect_with_limit(
            endpoint,
            self.config.identity.clone(),
            self.config.max_frame_size,
        )
        .await?;
        tracing::debug!(broker = %endpoint, "Client connected");
        self.socket = Some(socket);
        Ok(())
    }

    /// Send a request as `[""][MDPC01][service][body...]`
    pub async fn send(&mut self, service: &str, mut request: Envelope) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;

        request.push_front(Bytes::copy_from_slice(service.as_bytes()));
        request.push_front(Bytes::from_static(MDPC_CLIENT));
        request.push_front(Bytes::new());

        tracing::debug!(service = %service, "Sending request");
        socket.send(request).await
    }

    /// Wait up to the configured timeout for a reply
    ///
    /// Returns the reply body, or `None` if nothing arrived in time.
    /// Malformed or oversized replies are logged and skipped. A broken
    /// connection drops the socket and returns the error; `connect` again
    /// to continue.
    pub async fn recv(&mut self) -> Result<Option<Envelope>> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;

            let message = match timeout_at(deadline, socket.recv()).await {
                Ok(Ok(message)) => message,
                Ok(Err(Error::Protocol(e))) => {
                    tracing::warn!(error = %e, "Discarding reply");
                    continue;
                }
                Ok(Err(e)) => {
                    self.socket = None;
                    return Err(e);
                }
                Err(_) => return Ok(None),
            };

            match parse_reply(message) {
                Ok((service, reply)) => {
                    tracing::debug!(service = %String::from_utf8_lossy(&service), "Received reply");
                    return Ok(Some(reply));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding reply");
                }
            }
        }
    }

    /// Send a request and wait for one reply
    pub async fn request(&mut self, service: &str, body: impl Into<Bytes>) -> Result<Option<Envelope>> {
        self.send(service, Envelope::with_body(body)).await?;
        self.recv().await
    }

    /// Whether a broker connection is open
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}

/// Strip `[""][MDPC01][service]`, returning the service and the body
fn parse_reply(mut message: Envelope) -> Result<(Bytes, Envelope)> {
    let _delimiter = message.pop_front()?;
    let header = message.pop_front()?;
    if header != MDPC_CLIENT {
        return Err(ProtocolError::InvalidHeader(header).into());
    }
    let service = message.pop_front()?;
    Ok((service, message))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::RouterSocket;

    fn fast_config() -> ClientConfig {
        ClientConfig::default().timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let mut client = MdpClient::new(fast_config());
        let result = client.send("echo", Envelope::with_body("x")).await;
        assert!(matches!(result, Err(Error::NotConnected)));

        let result = client.recv().await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_send_wraps_request() {
        let mut router = RouterSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = MdpClient::new(fast_config().identity("c1"));
        client.connect(router.local_addr().to_string()).await.unwrap();
        assert!(client.is_connected());

        client
            .send("echo", Envelope::with_body("Hello World"))
            .await
            .unwrap();

        let frames = router.recv().await.unwrap().into_frames();
        assert_eq!(frames, vec!["c1", "", "MDPC01", "echo", "Hello World"]);
    }

    #[tokio::test]
    async fn test_recv_unwraps_reply() {
        let mut router = RouterSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = MdpClient::new(fast_config().identity("c1"));
        client.connect(router.local_addr().to_string()).await.unwrap();

        client.send("echo", Envelope::with_body("ping")).await.unwrap();
        router.recv().await.unwrap();

        router
            .send(Envelope::from_frames(["c1", "", "MDPC01", "echo", "pong"]))
            .unwrap();

        let reply = client.recv().await.unwrap().unwrap();
        assert_eq!(reply.into_frames(), vec!["pong"]);
    }

    #[tokio::test]
    async fn test_recv_timeout_is_none() {
        let router = RouterSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = MdpClient::new(fast_config());
        client.connect(router.local_addr().to_string()).await.unwrap();

        assert!(client.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recv_skips_worker_header() {
        let mut router = RouterSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = MdpClient::new(fast_config().identity("c1"));
        client.connect(router.local_addr().to_string()).await.unwrap();

        client.send("echo", Envelope::with_body("ping")).await.unwrap();
        router.recv().await.unwrap();

        router
            .send(Envelope::from_frames(["c1", "", "MDPW01", "echo", "wrong"]))
            .unwrap();
        router
            .send(Envelope::from_frames(["c1", "", "MDPC01", "echo", "pong"]))
            .unwrap();

        let reply = client.recv().await.unwrap().unwrap();
        assert_eq!(reply.into_frames(), vec!["pong"]);
    }

    #[tokio::test]
    async fn test_oversized_reply_does_not_poison_connection() {
        let mut router = RouterSocket::bind_with_limit("127.0.0.1:0", 1024).await.unwrap();
        let mut client = MdpClient::new(fast_config().identity("c1").max_frame_size(64));
        client.connect(router.local_addr().to_string()).await.unwrap();

        client.send("echo", Envelope::with_body("ping")).await.unwrap();
        router.recv().await.unwrap();

        let big = Bytes::from(vec![b'x'; 512]);
        router
            .send(Envelope::from_frames(vec![
                Bytes::from_static(b"c1"),
                Bytes::new(),
                Bytes::from_static(b"MDPC01"),
                Bytes::from_static(b"echo"),
                big,
            ]))
            .unwrap();
        router
            .send(Envelope::from_frames(["c1", "", "MDPC01", "echo", "small"]))
            .unwrap();

        let reply = client.recv().await.unwrap().unwrap();
        assert_eq!(reply.into_frames(), vec!["small"]);
        assert!(client.is_connected());

        // Later replies keep flowing on the same connection
        router
            .send(Envelope::from_frames(["c1", "", "MDPC01", "echo", "again"]))
            .unwrap();
        let reply = client.recv().await.unwrap().unwrap();
        assert_eq!(reply.into_frames(), vec!["again"]);
    }

    #[tokio::test]
    async fn test_oversized_request_refused() {
        let router = RouterSocket::bind("127.0.0.1:0").await.unwrap();
        // Large enough for the header frames, not for the body
        let mut client = MdpClient::new(fast_config().max_frame_size(6));
        client.connect(router.local_addr().to_string()).await.unwrap();

        let result = client.send("echo", Envelope::with_body("too long")).await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::FrameTooLarge { size: 8, max: 6 }))
        ));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_closed_connection_drops_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let closer = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut client = MdpClient::new(fast_config().timeout(Duration::from_secs(5)));
        client.connect(addr.to_string()).await.unwrap();
        closer.await.unwrap();

        let result = client.recv().await;
        assert!(matches!(result, Err(Error::ConnectionClosed) | Err(Error::Io(_))));
        assert!(!client.is_connected());
        assert!(matches!(client.recv().await, Err(Error::NotConnected)));
    }
}
