//! Single-process in-memory log backend.
//!
//! `MemoryLog` is the reference implementation of the [`SharedLog`]
//! contract and defines the minimum correctness bar for any backend:
//! appends are visible to every read issued after the append returns, and
//! GSNs are assigned in strict, gapless, non-reused order.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use logstore_common::{CommitRecord, DataRecord, Error, Gsn, RecordRef, Result};
use parking_lot::RwLock;

use crate::{ReplayHandler, SharedLog};

/// Both record stores and the tail counter live under one lock, which is
/// what makes GSN assignment gapless and unique under concurrent appends.
struct MemoryLogInner {
    data: HashMap<Gsn, DataRecord>,
    commits: BTreeMap<Gsn, CommitRecord>,
    tail: Gsn,
}

/// In-memory [`SharedLog`] backend for single-process use and testing.
///
/// The log never trims, so [`head`](SharedLog::head) is fixed at 1.
pub struct MemoryLog {
    inner: RwLock<MemoryLogInner>,
}

impl MemoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLogInner {
                data: HashMap::new(),
                commits: BTreeMap::new(),
                tail: 0,
            }),
        }
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedLog for MemoryLog {
    async fn append_data(&self, rec: DataRecord) -> Result<RecordRef> {
        let mut inner = self.inner.write();
        inner.tail += 1;
        let gsn = inner.tail;
        inner.data.insert(gsn, rec);
        Ok(RecordRef::shardless(gsn))
    }

    async fn append_commit(&self, rec: CommitRecord) -> Result<Gsn> {
        let mut inner = self.inner.write();
        inner.tail += 1;
        let gsn = inner.tail;
        inner.commits.insert(gsn, rec);
        Ok(gsn)
    }

    async fn read_data(&self, r: RecordRef) -> Result<DataRecord> {
        let inner = self.inner.read();
        inner
            .data
            .get(&r.gsn)
            .cloned()
            .ok_or_else(|| Error::not_found(r.gsn, r.shard_id))
    }

    async fn replay_commits(
        &self,
        from: Gsn,
        to: Gsn,
        handler: &mut ReplayHandler<'_>,
    ) -> Result<()> {
        if from > to {
            return Ok(());
        }
        let inner = self.inner.read();
        for (gsn, rec) in inner.commits.range(from..=to) {
            handler(*gsn, rec)?;
        }
        Ok(())
    }

    async fn head(&self) -> Result<Gsn> {
        Ok(1)
    }

    async fn tail(&self) -> Result<Gsn> {
        Ok(self.inner.read().tail)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use logstore_common::CommitEntry;

    use super::*;

    fn data(key: &str, value: &str) -> DataRecord {
        DataRecord::new(key, value.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn should_read_back_appended_record() {
        let log = MemoryLog::new();

        let r = log.append_data(data("k1", "v1")).await.unwrap();
        assert_eq!(r, RecordRef::shardless(1));

        let rec = log.read_data(r).await.unwrap();
        assert_eq!(rec.key, "k1");
        assert_eq!(rec.value.as_ref(), b"v1");
    }

    #[tokio::test]
    async fn should_share_one_counter_across_data_and_commits() {
        let log = MemoryLog::new();

        let r1 = log.append_data(data("k1", "v1")).await.unwrap();
        let r2 = log.append_data(data("k2", "v2")).await.unwrap();
        let commit_gsn = log
            .append_commit(CommitRecord::new(vec![
                CommitEntry {
                    key: "k1".into(),
                    data_ref: r1,
                },
                CommitEntry {
                    key: "k2".into(),
                    data_ref: r2,
                },
            ]))
            .await
            .unwrap();

        assert_eq!(r1.gsn, 1);
        assert_eq!(r2.gsn, 2);
        assert_eq!(commit_gsn, 3);
        // Every entry's GSN is strictly below the commit's GSN.
        assert!(r1.gsn < commit_gsn && r2.gsn < commit_gsn);
        assert_eq!(log.tail().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn should_fail_read_of_unknown_gsn() {
        let log = MemoryLog::new();
        let err = log.read_data(RecordRef::shardless(99)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn should_fail_read_of_commit_gsn() {
        let log = MemoryLog::new();
        let commit_gsn = log.append_commit(CommitRecord::default()).await.unwrap();
        let err = log
            .read_data(RecordRef::shardless(commit_gsn))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn should_assign_gapless_gsns_under_concurrent_appends() {
        let log = Arc::new(MemoryLog::new());
        let n = 64;

        let mut tasks = Vec::with_capacity(n);
        for i in 0..n {
            let log = Arc::clone(&log);
            tasks.push(tokio::spawn(async move {
                log.append_data(data(&format!("k{i}"), "v")).await.unwrap()
            }));
        }

        let mut gsns = Vec::with_capacity(n);
        for task in tasks {
            gsns.push(task.await.unwrap().gsn);
        }
        gsns.sort_unstable();

        // Exactly {1..n}: no duplicates, no gaps, no reuse.
        let expected: Vec<Gsn> = (1..=n as Gsn).collect();
        assert_eq!(gsns, expected);
        assert_eq!(log.tail().await.unwrap(), n as Gsn);
    }

    #[tokio::test]
    async fn should_replay_commits_in_ascending_order_skipping_data() {
        let log = MemoryLog::new();

        // gsn 1 data, gsn 2 commit, gsn 3 data, gsn 4 commit
        let r1 = log.append_data(data("k1", "v1")).await.unwrap();
        let c1 = log
            .append_commit(CommitRecord::new(vec![CommitEntry {
                key: "k1".into(),
                data_ref: r1,
            }]))
            .await
            .unwrap();
        let r2 = log.append_data(data("k2", "v2")).await.unwrap();
        let c2 = log
            .append_commit(CommitRecord::new(vec![CommitEntry {
                key: "k2".into(),
                data_ref: r2,
            }]))
            .await
            .unwrap();

        let mut seen = Vec::new();
        log.replay_commits(1, log.tail().await.unwrap(), &mut |gsn, rec| {
            seen.push((gsn, rec.entries[0].key.clone()));
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(seen, vec![(c1, "k1".to_string()), (c2, "k2".to_string())]);
    }

    #[tokio::test]
    async fn should_replay_only_requested_range() {
        let log = MemoryLog::new();
        let mut commit_gsns = Vec::new();
        for _ in 0..4 {
            commit_gsns.push(log.append_commit(CommitRecord::default()).await.unwrap());
        }

        let mut seen = Vec::new();
        log.replay_commits(commit_gsns[1], commit_gsns[2], &mut |gsn, _| {
            seen.push(gsn);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(seen, vec![commit_gsns[1], commit_gsns[2]]);
    }

    #[tokio::test]
    async fn should_abort_replay_on_handler_error() {
        let log = MemoryLog::new();
        for _ in 0..3 {
            log.append_commit(CommitRecord::default()).await.unwrap();
        }

        let mut calls = 0;
        let err = log
            .replay_commits(1, 3, &mut |_, _| {
                calls += 1;
                if calls == 2 {
                    Err(Error::Replay("handler refused".into()))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap_err();

        // Propagated verbatim, scan aborted.
        assert!(matches!(err, Error::Replay(msg) if msg == "handler refused"));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn should_replay_nothing_for_inverted_range() {
        let log = MemoryLog::new();
        log.append_commit(CommitRecord::default()).await.unwrap();

        let mut calls = 0;
        log.replay_commits(5, 1, &mut |_, _| {
            calls += 1;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn should_report_fixed_head_and_moving_tail() {
        let log = MemoryLog::new();
        assert_eq!(log.head().await.unwrap(), 1);
        assert_eq!(log.tail().await.unwrap(), 0);

        log.append_data(data("k", "v")).await.unwrap();
        assert_eq!(log.head().await.unwrap(), 1);
        assert_eq!(log.tail().await.unwrap(), 1);
    }
}
