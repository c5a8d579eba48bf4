//! Record types shared by the log, the index and the orchestrator.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Global sequence number assigned by the log to every appended record.
/// GSNs total-order all appends within one log instance.
pub type Gsn = u64;

/// Locator of a record in the shared log.
///
/// A `RecordRef` is unique per `(shard_id, gsn)` within a log instance and
/// is never reused. Unsharded backends set `shard_id` to 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub gsn: Gsn,
    pub shard_id: u32,
}

impl RecordRef {
    /// Ref into an unsharded log.
    #[must_use]
    pub const fn shardless(gsn: Gsn) -> Self {
        Self { gsn, shard_id: 0 }
    }

    /// Ref into a sharded log.
    #[must_use]
    pub const fn sharded(shard_id: u32, gsn: Gsn) -> Self {
        Self { gsn, shard_id }
    }
}

impl std::fmt::Display for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.shard_id, self.gsn)
    }
}

/// One key/value write, immutable once appended, addressed by its
/// [`RecordRef`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRecord {
    pub key: String,
    pub value: Bytes,
}

impl DataRecord {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Binds a key to the data record written for it within one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub key: String,
    pub data_ref: RecordRef,
}

/// An ordered batch of [`CommitEntry`] appended as one atomic log entry.
/// The GSN assigned to the commit record itself is the *commit GSN*, used
/// as the logical timestamp of the whole multi-key write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub entries: Vec<CommitEntry>,
}

impl CommitRecord {
    #[must_use]
    pub fn new(entries: Vec<CommitEntry>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ref_constructors() {
        let r = RecordRef::shardless(42);
        assert_eq!(r.gsn, 42);
        assert_eq!(r.shard_id, 0);

        let r = RecordRef::sharded(3, 7);
        assert_eq!(r.gsn, 7);
        assert_eq!(r.shard_id, 3);
        assert_eq!(r.to_string(), "3/7");
    }

    #[test]
    fn test_data_record_serde() {
        let rec = DataRecord::new("k1", "v1".as_bytes().to_vec());
        let json = serde_json::to_string(&rec).unwrap();
        let back: DataRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
