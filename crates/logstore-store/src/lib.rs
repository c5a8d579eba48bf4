//! Logstore Store - the storage orchestrator
//!
//! Composes the shared log and the map index into a key-value store with
//! atomic multi-key writes ([`StorageServer::multi_put`]) and consistent
//! multi-key reads ([`StorageServer::multi_get`]), plus the explicit
//! recovery path that rebuilds the index by replaying the log.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use logstore_common::{CommitEntry, CommitRecord, DataRecord, Result};
use logstore_index::MapIndex;
use logstore_log::SharedLog;
use tracing::{debug, info};

/// The storage server.
///
/// The log backend is injected at construction; the orchestrator never
/// inspects which implementation it got. Both collaborators are shared by
/// handle, so arbitrarily many requests can run concurrently with no
/// request-level lock here: blocking happens only inside the log backend
/// and the index's own lock.
pub struct StorageServer {
    log: Arc<dyn SharedLog>,
    index: Arc<MapIndex>,
}

impl StorageServer {
    #[must_use]
    pub fn new(log: Arc<dyn SharedLog>, index: Arc<MapIndex>) -> Self {
        Self { log, index }
    }

    /// Writes a batch of key/value pairs atomically.
    ///
    /// Appends one data record per pair, then one commit record binding
    /// them all, then applies the commit to the index — the instant the
    /// write becomes externally visible. Either every key in the request
    /// becomes visible together or none does.
    ///
    /// # Errors
    ///
    /// Any append failure aborts the call with that error. Data records
    /// already appended stay in the log as unreferenced garbage: no key
    /// becomes visible without its commit, and this design does not
    /// reclaim them.
    pub async fn multi_put(&self, kvs: Vec<(String, Bytes)>) -> Result<()> {
        let mut entries = Vec::with_capacity(kvs.len());
        for (key, value) in kvs {
            let data_ref = self
                .log
                .append_data(DataRecord { key: key.clone(), value })
                .await?;
            entries.push(CommitEntry { key, data_ref });
        }

        let commit_gsn = self
            .log
            .append_commit(CommitRecord::new(entries.clone()))
            .await?;

        // Pure in-memory mutation, cannot fail.
        self.index.apply_commit(commit_gsn, &entries);
        debug!(commit_gsn, keys = entries.len(), "multi_put committed");
        Ok(())
    }

    /// Reads the current values for a batch of keys.
    ///
    /// Keys without an index entry are simply absent from the result.
    ///
    /// # Errors
    ///
    /// A resolved ref that fails to read aborts the whole call: an index
    /// entry pointing at an unreadable record means the log and the index
    /// have diverged, which needs out-of-band recovery, not a per-key
    /// miss.
    pub async fn multi_get(&self, keys: &[String]) -> Result<HashMap<String, Bytes>> {
        let offsets = self.index.get_offsets(keys);

        let mut values = HashMap::with_capacity(offsets.len());
        for key in keys {
            let Some(data_ref) = offsets.get(key) else {
                continue;
            };
            let rec = self.log.read_data(*data_ref).await?;
            values.insert(key.clone(), rec.value);
        }
        Ok(values)
    }

    /// Rebuilds the index by replaying every commit record between the
    /// log's head and tail, in ascending GSN order. Safe to run against a
    /// populated index: stale entries are skipped by the index itself.
    /// Returns the number of commits applied.
    ///
    /// # Errors
    ///
    /// Propagates any replay failure from the log backend.
    pub async fn rebuild_index(&self) -> Result<u64> {
        let head = self.log.head().await?;
        let tail = self.log.tail().await?;

        let mut applied = 0u64;
        let index = Arc::clone(&self.index);
        self.log
            .replay_commits(head, tail, &mut |commit_gsn, rec| {
                index.apply_commit(commit_gsn, &rec.entries);
                applied += 1;
                Ok(())
            })
            .await?;

        info!(head, tail, applied, "index rebuilt from log");
        Ok(applied)
    }
}
