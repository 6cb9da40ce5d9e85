//! Echo client
//!
//! Pipelines requests to the "echo" service, collects the replies, then
//! asks the broker whether the service is available.
//!
//! Run with: cargo run --example client [BROKER_ADDR] [COUNT]

use mdp_rs::{ClientConfig, Envelope, MdpClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mdp_rs=info".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let broker = args.next().unwrap_or_else(|| "127.0.0.1:5555".to_string());
    let count: usize = match args.next() {
        Some(count) => count.parse()?,
        None => 10,
    };

    let mut client = MdpClient::new(ClientConfig::default());
    client.connect(&broker).await?;

    for i in 0..count {
        client
            .send("echo", Envelope::with_body(format!("Hello World {}", i)))
            .await?;
    }

    let mut received = 0;
    while received < count {
        match client.recv().await? {
            Some(reply) => {
                received += 1;
                println!("Reply: {}", String::from_utf8_lossy(reply.body()?));
            }
            None => {
                println!("Timed out with {}/{} replies", received, count);
                break;
            }
        }
    }

    if let Some(status) = client.request("mmi.service", "echo").await? {
        println!("mmi.service echo -> {}", String::from_utf8_lossy(status.body()?));
    }

    Ok(())
}
