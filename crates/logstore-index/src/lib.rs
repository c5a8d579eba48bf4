//! Logstore Index - the map service
//!
//! Materializes "current value location per key" from a stream of commit
//! records, and is the single authority for what is visible now. The
//! index owns only this derived view; it can always be rebuilt by
//! replaying the log's commit records in ascending GSN order.

use std::collections::HashMap;

use logstore_common::{CommitEntry, Gsn, RecordRef};
use parking_lot::RwLock;
use tracing::trace;

/// Index entry: where a key's current value lives and which commit put it
/// there. An entry is never overwritten by a lower-or-equal commit GSN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyMeta {
    pub data_ref: RecordRef,
    pub commit_gsn: Gsn,
}

/// The key map and the high-water mark share one lock so that a commit's
/// updates and the mark move together, atomically for readers.
#[derive(Default)]
struct IndexInner {
    keys: HashMap<String, KeyMeta>,
    max_commit_gsn: Gsn,
}

/// In-memory map service.
///
/// One reader-writer lock covers the whole key space: writers serialize
/// with each other and with readers, readers run concurrently. Coarse by
/// design; apply/get cost is proportional to batch size, not index size.
///
/// Constructed once at process start and handed to whoever needs it by
/// handle; never ambient global state.
#[derive(Default)]
pub struct MapIndex {
    inner: RwLock<IndexInner>,
}

impl MapIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one commit atomically relative to concurrent reads: a
    /// reader never observes part of this commit's updates.
    ///
    /// Per entry, the stored `(data_ref, commit_gsn)` is overwritten iff
    /// the key is absent or its stored commit GSN is strictly less than
    /// `commit_gsn`; otherwise the entry is skipped. The skip is what
    /// keeps replays and out-of-order delivery from clobbering a newer
    /// value with an older one. The high-water mark is raised
    /// unconditionally.
    pub fn apply_commit(&self, commit_gsn: Gsn, entries: &[CommitEntry]) {
        let mut inner = self.inner.write();

        if commit_gsn > inner.max_commit_gsn {
            inner.max_commit_gsn = commit_gsn;
        }

        for entry in entries {
            let stale = inner
                .keys
                .get(&entry.key)
                .is_some_and(|meta| meta.commit_gsn >= commit_gsn);
            if stale {
                trace!(key = %entry.key, commit_gsn, "skipping stale commit entry");
            } else {
                inner.keys.insert(
                    entry.key.clone(),
                    KeyMeta {
                        data_ref: entry.data_ref,
                        commit_gsn,
                    },
                );
            }
        }
    }

    /// Resolves a batch of keys to their current data locations under one
    /// shared lock: a single atomic snapshot of the index. Keys without an
    /// entry are omitted, never an error and never a placeholder.
    #[must_use]
    pub fn get_offsets(&self, keys: &[String]) -> HashMap<String, RecordRef> {
        let inner = self.inner.read();
        let mut res = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(meta) = inner.keys.get(key) {
                res.insert(key.clone(), meta.data_ref);
            }
        }
        res
    }

    /// Largest commit GSN applied so far; checkpoint/recovery bootstrap.
    #[must_use]
    pub fn max_commit_gsn(&self) -> Gsn {
        self.inner.read().max_commit_gsn
    }

    /// Number of keys currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, gsn: Gsn) -> CommitEntry {
        CommitEntry {
            key: key.to_string(),
            data_ref: RecordRef::shardless(gsn),
        }
    }

    fn lookup(index: &MapIndex, key: &str) -> Option<RecordRef> {
        index.get_offsets(&[key.to_string()]).remove(key)
    }

    #[test]
    fn test_apply_then_get() {
        let index = MapIndex::new();
        index.apply_commit(3, &[entry("k1", 1), entry("k2", 2)]);

        assert_eq!(lookup(&index, "k1"), Some(RecordRef::shardless(1)));
        assert_eq!(lookup(&index, "k2"), Some(RecordRef::shardless(2)));
        assert_eq!(index.len(), 2);
        assert_eq!(index.max_commit_gsn(), 3);
    }

    #[test]
    fn test_missing_keys_are_omitted() {
        let index = MapIndex::new();
        index.apply_commit(2, &[entry("k1", 1)]);

        let res = index.get_offsets(&["k1".into(), "missing".into()]);
        assert_eq!(res.len(), 1);
        assert!(res.contains_key("k1"));
        assert!(!res.contains_key("missing"));
    }

    #[test]
    fn test_last_commit_wins_in_order() {
        let index = MapIndex::new();
        index.apply_commit(2, &[entry("k1", 1)]);
        index.apply_commit(4, &[entry("k1", 3)]);

        assert_eq!(lookup(&index, "k1"), Some(RecordRef::shardless(3)));
    }

    #[test]
    fn test_last_commit_wins_out_of_order() {
        let index = MapIndex::new();
        // Later commit applied first; the earlier one must not clobber it.
        index.apply_commit(4, &[entry("k1", 3)]);
        index.apply_commit(2, &[entry("k1", 1)]);

        assert_eq!(lookup(&index, "k1"), Some(RecordRef::shardless(3)));
        // The mark still reflects the largest commit seen.
        assert_eq!(index.max_commit_gsn(), 4);
    }

    #[test]
    fn test_equal_commit_gsn_is_skipped() {
        let index = MapIndex::new();
        index.apply_commit(2, &[entry("k1", 1)]);
        index.apply_commit(2, &[entry("k1", 9)]);

        assert_eq!(lookup(&index, "k1"), Some(RecordRef::shardless(1)));
    }

    #[test]
    fn test_replay_is_idempotent() {
        let index = MapIndex::new();
        let batch = [entry("k1", 1), entry("k2", 2)];

        index.apply_commit(3, &batch);
        let first = index.get_offsets(&["k1".into(), "k2".into()]);
        let first_mark = index.max_commit_gsn();

        index.apply_commit(3, &batch);
        assert_eq!(index.get_offsets(&["k1".into(), "k2".into()]), first);
        assert_eq!(index.max_commit_gsn(), first_mark);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_mark_raised_even_when_all_entries_stale() {
        let index = MapIndex::new();
        index.apply_commit(5, &[entry("k1", 4)]);
        // Older commit for the same key: entry skipped, mark unchanged.
        index.apply_commit(3, &[entry("k1", 2)]);
        assert_eq!(index.max_commit_gsn(), 5);
        // Newer commit with an empty batch still raises the mark.
        index.apply_commit(8, &[]);
        assert_eq!(index.max_commit_gsn(), 8);
    }
}
