//! Logstore Common - Shared types and utilities
//!
//! This crate provides the record types, error definitions, and
//! configuration structures used across all Logstore components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{LogBackendConfig, RemoteLogConfig, ServerConfig};
pub use error::{Error, Result};
pub use types::*;
