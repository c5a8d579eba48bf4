//! Self-describing byte encoding for records handed to a remote log.
//!
//! A remote log stores opaque payloads, so each record carries its own
//! kind tag: a reader can tell a data record from a commit record without
//! consulting anything but the payload itself.

use logstore_common::{CommitRecord, DataRecord, Error, Result};
use serde::{Deserialize, Serialize};

/// Tagged envelope for every payload appended to a remote log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    Data(DataRecord),
    Commit(CommitRecord),
}

/// Encode an entry to its wire form.
pub fn encode(entry: &LogEntry) -> Result<Vec<u8>> {
    serde_json::to_vec(entry).map_err(|e| Error::serialization(e.to_string()))
}

/// Decode an entry from its wire form.
pub fn decode(bytes: &[u8]) -> Result<LogEntry> {
    serde_json::from_slice(bytes).map_err(|e| Error::serialization(e.to_string()))
}
