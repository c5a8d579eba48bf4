//! Logstore Server - storage API over a shared log
//!
//! Wires a shared-log backend (in-memory or remote) and a fresh map index
//! into the storage orchestrator, then serves MultiPut/MultiGet over a
//! thin JSON API.

mod http;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use logstore_common::{LogBackendConfig, RemoteLogConfig, ServerConfig};
use logstore_index::MapIndex;
use logstore_log::{MemoryLog, RemoteLog, SharedLog};
use logstore_store::StorageServer;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http::AppState;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Single-process in-memory log (testing and local development)
    Memory,
    /// Externally operated ordered log service
    Remote,
}

#[derive(Parser, Debug)]
#[command(name = "logstore-server")]
#[command(about = "Logstore storage server")]
#[command(version)]
struct Args {
    /// Listen address for the storage API
    #[arg(short, long, default_value = "0.0.0.0:7070")]
    listen: String,

    /// Shared-log backend
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    /// Remote log endpoint (repeatable; required with --backend=remote)
    #[arg(long = "log-endpoint")]
    log_endpoints: Vec<String>,

    /// Number of handles in the remote log pool
    #[arg(long, default_value = "4")]
    pool_size: usize,

    /// Replication factor requested from the remote log service
    #[arg(long, default_value = "2")]
    replication_factor: u32,

    /// Rebuild the index from the log before serving
    #[arg(long, default_value_t = false)]
    rebuild_on_start: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<(ServerConfig, bool, String)> {
        let listen: SocketAddr = self
            .listen
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", self.listen, e))?;
        let backend = match self.backend {
            Backend::Memory => LogBackendConfig::Memory,
            Backend::Remote => LogBackendConfig::Remote(RemoteLogConfig {
                endpoints: self.log_endpoints,
                pool_size: self.pool_size,
                replication_factor: self.replication_factor,
            }),
        };
        Ok((
            ServerConfig { listen, backend },
            self.rebuild_on_start,
            self.log_level,
        ))
    }
}

fn build_log(backend: &LogBackendConfig) -> Result<Arc<dyn SharedLog>> {
    match backend {
        LogBackendConfig::Memory => Ok(Arc::new(MemoryLog::new())),
        LogBackendConfig::Remote(remote) => {
            let log = RemoteLog::from_config(remote)
                .map_err(|e| anyhow::anyhow!("Failed to build remote log pool: {}", e))?;
            info!(
                pool_size = log.pool_size(),
                replication_factor = remote.replication_factor,
                "Remote log pool connected"
            );
            Ok(Arc::new(log))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, rebuild_on_start, log_level) = args.into_config()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Logstore server");

    let log = build_log(&config.backend)?;
    let index = Arc::new(MapIndex::new());
    let store = Arc::new(StorageServer::new(log, index));

    if rebuild_on_start {
        let applied = store
            .rebuild_index()
            .await
            .map_err(|e| anyhow::anyhow!("Index rebuild failed: {}", e))?;
        info!(applied, "Index rebuilt before serving");
    }

    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/health", get(http::health))
        .route("/v1/multi-put", post(http::multi_put))
        .route("/v1/multi-get", post(http::multi_get))
        .route("/v1/rebuild", post(http::rebuild))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Storage API listening on {}", config.listen);
    let listener = TcpListener::bind(config.listen).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}
