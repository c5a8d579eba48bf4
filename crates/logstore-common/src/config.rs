//! Configuration types for Logstore
//!
//! This module defines configuration structures used across components.
//! How the values are supplied (flags, files, environment) is decided by
//! the binary; the structs here only describe the shape.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration for the storage server process
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address for the storage API
    pub listen: SocketAddr,
    /// Which shared-log backend to run against
    pub backend: LogBackendConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:7070".parse().unwrap(),
            backend: LogBackendConfig::default(),
        }
    }
}

/// Shared-log backend selection
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogBackendConfig {
    /// Single-process in-memory log (testing and local development)
    #[default]
    Memory,
    /// Externally operated ordered log service behind a handle pool
    Remote(RemoteLogConfig),
}

/// Configuration for the remote-log adapter.
///
/// Endpoint discovery and replication factor describe the external
/// service; the adapter itself only uses them to build its handle pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteLogConfig {
    /// Endpoints of the external log service
    pub endpoints: Vec<String>,
    /// Number of independent handles in the pool
    pub pool_size: usize,
    /// Replication factor requested from the external service
    pub replication_factor: u32,
}

impl Default for RemoteLogConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            pool_size: 4,
            replication_factor: 2,
        }
    }
}
