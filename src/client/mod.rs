//! Majordomo client
//!
//! Sends named-service requests through the broker and waits for replies
//! with a bounded timeout.

pub mod config;
pub mod requester;

pub use config::ClientConfig;
pub use requester::MdpClient;
