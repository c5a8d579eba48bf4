//! Error types for Logstore
//!
//! This module defines the common error type used throughout the system.

use thiserror::Error;

use crate::types::Gsn;

/// Common result type for Logstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Logstore
#[derive(Debug, Error)]
pub enum Error {
    // Log append errors
    #[error("append rejected by log backend: {0}")]
    Append(String),

    // Log read errors
    #[error("record not found: gsn={gsn} shard={shard_id}")]
    NotFound { gsn: Gsn, shard_id: u32 },

    // Replay scan errors (handler errors propagate verbatim, not wrapped)
    #[error("replay failed: {0}")]
    Replay(String),

    // Network/RPC errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an append error
    pub fn append(msg: impl Into<String>) -> Self {
        Self::Append(msg.into())
    }

    /// Create a not-found error for a record locator
    #[must_use]
    pub fn not_found(gsn: Gsn, shard_id: u32) -> Self {
        Self::NotFound { gsn, shard_id }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this is a not-found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from the transport layer and a caller may
    /// reasonably retry the whole request. The core itself never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_not_found() {
        assert!(Error::not_found(5, 0).is_not_found());
        assert!(!Error::append("backend down").is_not_found());
    }

    #[test]
    fn test_error_retryable() {
        assert!(Error::transport("connection reset").is_retryable());
        assert!(!Error::append("rejected").is_retryable());
        assert!(!Error::not_found(1, 0).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let e = Error::not_found(42, 3);
        assert_eq!(e.to_string(), "record not found: gsn=42 shard=3");
    }
}
