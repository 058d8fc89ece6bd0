//! Tether realtime server
//!
//! Run with: tether-server

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tether::realtime::{RealtimeRouter, RealtimeServer, SessionRegistry};
use tether::storage::SqliteStore;
use tether::types::StorageConfig;

#[derive(Parser, Debug)]
#[command(name = "tether-server")]
#[command(about = "Tether realtime presence and messaging server")]
struct Args {
    /// Database path
    #[arg(
        long,
        env = "TETHER_DB_PATH",
        default_value = "~/.local/share/tether/tether.db"
    )]
    db_path: String,

    /// WebSocket server port
    #[arg(long, env = "TETHER_PORT", default_value = "4040")]
    port: u16,

    /// Bound on a single store call in milliseconds
    #[arg(long, env = "TETHER_GATEWAY_TIMEOUT_MS", default_value = "5000")]
    gateway_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Expand ~ in path
    let db_path = shellexpand::tilde(&args.db_path).to_string();

    // Losing the store at startup is fatal; nothing can proceed without it
    let store = Arc::new(SqliteStore::open(StorageConfig { db_path })?);

    let registry = SessionRegistry::new();
    let router = RealtimeRouter::new(registry, store)
        .with_gateway_timeout(Duration::from_millis(args.gateway_timeout_ms));

    let server = RealtimeServer::new(router, args.port);
    tracing::info!("Tether server v{} starting on port {}", tether::VERSION, args.port);
    server.start().await?;

    Ok(())
}
