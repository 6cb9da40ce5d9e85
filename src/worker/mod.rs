//! Majordomo worker
//!
//! Registers with the broker for one service and serves its requests.

pub mod config;
pub mod runtime;

pub use config::WorkerConfig;
pub use runtime::MdpWorker;
