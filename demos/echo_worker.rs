//! Echo worker
//!
//! Registers for the "echo" service and sends every request straight back.
//!
//! Run with: cargo run --example echo_worker [BROKER_ADDR]

use mdp_rs::{MdpWorker, WorkerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mdp_rs=info".parse()?))
        .init();

    let broker = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5555".to_string());

    let mut worker = MdpWorker::new(WorkerConfig::new("echo"));
    worker.connect(broker).await?;

    let mut reply = None;
    loop {
        let request = worker.recv(reply.take()).await?;
        reply = Some(request);
    }
}
