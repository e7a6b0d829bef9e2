//! Elastic Rendezvous Server
//!
//! This binary serves the rendezvous backend that elastic agents on many
//! nodes join to agree on the membership of each round.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! dtr-rendezvous
//!
//! # Start with custom port and a shorter lease
//! dtr-rendezvous --port 29401 --lease-ttl 15
//! ```

mod service;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tonic::transport::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elastic_core::rendezvous::proto::rendezvous_service_server::RendezvousServiceServer;
use elastic_core::RendezvousStore;
use service::RendezvousServiceImpl;

/// Elastic Rendezvous Server
#[derive(Parser, Debug)]
#[command(name = "dtr-rendezvous")]
#[command(about = "Rendezvous backend for elastic worker groups")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "29400")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    address: String,

    /// Node lease lifetime in seconds
    #[arg(long, default_value = "30")]
    lease_ttl: u64,

    /// Interval between lease expiry sweeps in seconds
    #[arg(long, default_value = "5")]
    sweep_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.lease_ttl == 0 || args.sweep_interval == 0 {
        return Err("--lease-ttl and --sweep-interval must be greater than 0".into());
    }

    tracing::info!("Starting DTR rendezvous server");
    tracing::info!("  Lease TTL: {}s", args.lease_ttl);
    tracing::info!("  Sweep interval: {}s", args.sweep_interval);

    let store = Arc::new(RendezvousStore::new(Duration::from_secs(args.lease_ttl)));
    let service = RendezvousServiceImpl::new(store.clone());

    let addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    tracing::info!("Listening on {}", addr);

    // Report expired leases in the background
    let bg_store = store.clone();
    let sweep_interval = Duration::from_secs(args.sweep_interval);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            for (run_id, node_id) in bg_store.expire_leases().await {
                tracing::warn!("Node {} of run {} missed its lease", node_id, run_id);
            }
        }
    });

    Server::builder()
        .add_service(RendezvousServiceServer::new(service))
        .serve_with_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down rendezvous server...");
        })
        .await?;

    Ok(())
}
