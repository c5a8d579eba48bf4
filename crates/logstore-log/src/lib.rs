//! Logstore Log - the append-only shared-log substrate
//!
//! This crate defines the [`SharedLog`] contract that every backend must
//! satisfy, the single-process [`MemoryLog`] reference backend, and the
//! [`RemoteLog`] adapter that fronts an externally operated ordered log
//! service through a fixed pool of handles.

pub mod codec;
pub mod memory;
pub mod remote;

use async_trait::async_trait;
use logstore_common::{CommitRecord, DataRecord, Gsn, RecordRef, Result};

pub use codec::LogEntry;
pub use memory::MemoryLog;
pub use remote::{HttpLogHandle, LogHandle, RemoteLog};

/// Callback invoked once per commit record during a replay scan.
pub type ReplayHandler<'a> = dyn FnMut(Gsn, &CommitRecord) -> Result<()> + Send + 'a;

/// The append-only shared log underlying all data and commit records.
///
/// Data and commit records share one monotonically increasing GSN counter,
/// so a commit's GSN is not contiguous with the GSNs of the data records it
/// references. Callers must not assume contiguity; the only ordering
/// guarantee is that every entry's GSN is strictly less than the GSN of the
/// commit record referencing it.
///
/// Every backend must make appends visible to any read issued after the
/// append call returns, and must assign GSNs in strict, non-reused order.
#[async_trait]
pub trait SharedLog: Send + Sync {
    /// Durably appends one key/value record and returns its locator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Append`](logstore_common::Error::Append) if the
    /// backend rejects the record or is unavailable.
    async fn append_data(&self, rec: DataRecord) -> Result<RecordRef>;

    /// Durably appends a commit batch referencing prior data records and
    /// returns the commit's own GSN, the logical timestamp of the write.
    /// Entries are never silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Append`](logstore_common::Error::Append) if the
    /// backend rejects the record or is unavailable.
    async fn append_commit(&self, rec: CommitRecord) -> Result<Gsn>;

    /// Random-access read of a data record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](logstore_common::Error::NotFound) if the
    /// ref never existed, was reclaimed, or does not address a data record.
    async fn read_data(&self, r: RecordRef) -> Result<DataRecord>;

    /// Invokes `handler` once per commit record found in `[from, to]`, in
    /// strictly ascending GSN order, skipping GSNs that hold data records
    /// or are unused. Aborts the scan on the first handler error and
    /// propagates it verbatim. Used to rebuild the index.
    async fn replay_commits(
        &self,
        from: Gsn,
        to: Gsn,
        handler: &mut ReplayHandler<'_>,
    ) -> Result<()>;

    /// Oldest retained GSN, bounding recovery scans from below.
    async fn head(&self) -> Result<Gsn>;

    /// Newest assigned GSN, bounding recovery scans from above.
    async fn tail(&self) -> Result<Gsn>;
}
