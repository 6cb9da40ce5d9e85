//! Majordomo-style service broker
//!
//! Clients send requests to named services, workers register for those
//! services, and a broker in between routes each request to the
//! least-recently-used idle worker and each reply back to its client.
//! Workers and broker heartbeat each other so dead workers are purged and
//! a silent broker makes its workers reconnect.
//!
//! # Example
//! ```no_run
//! use mdp_rs::{BrokerConfig, MdpBroker};
//!
//! # async fn example() -> mdp_rs::Result<()> {
//! let config = BrokerConfig::default();
//! let mut broker = MdpBroker::bind(config).await?;
//! broker.listen().await
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;
pub mod transport;
pub mod worker;

pub use client::{ClientConfig, MdpClient};
pub use error::{Error, ProtocolError, Result};
pub use protocol::{Address, Command, Envelope};
pub use server::{BrokerConfig, MdpBroker};
pub use stats::BrokerStats;
pub use worker::{MdpWorker, WorkerConfig};
