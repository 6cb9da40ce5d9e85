//! Majordomo broker
//!
//! Run with: cargo run --example broker [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example broker                   # binds to 0.0.0.0:5555
//!   cargo run --example broker 127.0.0.1:5556    # binds to 127.0.0.1:5556
//!
//! Set RUST_LOG=mdp_rs=debug to see per-message routing.

use std::net::SocketAddr;

use mdp_rs::{BrokerConfig, MdpBroker};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mdp_rs=info".parse()?))
        .init();

    let mut config = BrokerConfig::default();
    if let Some(addr) = std::env::args().nth(1) {
        let addr: SocketAddr = addr.parse()?;
        config = config.bind(addr);
    }

    let mut broker = MdpBroker::bind(config).await?;
    println!("Broker listening on {}", broker.local_addr());
    println!("Press Ctrl+C to stop");

    broker
        .listen_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let stats = broker.broker().stats();
    println!(
        "Stats: workers={} services={} dispatched={} replies={} purged={}",
        stats.workers,
        stats.services,
        stats.counters.requests_dispatched,
        stats.counters.replies_routed,
        stats.counters.workers_purged,
    );

    Ok(())
}
