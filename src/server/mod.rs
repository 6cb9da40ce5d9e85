//! Majordomo broker
//!
//! [`Broker`] is the routing engine, [`MdpBroker`] binds it to a socket.

pub mod broker;
pub mod config;
pub mod listener;
pub mod state;

pub use broker::Broker;
pub use config::BrokerConfig;
pub use listener::MdpBroker;
pub use state::{WorkerAction, WorkerState};
