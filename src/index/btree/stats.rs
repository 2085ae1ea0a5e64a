//! Per-tree operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`BTreeStats`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeStatsSnapshot {
    /// Leaf nodes split by `put`.
    pub leaf_splits: u64,
    /// Inner nodes split by `put` or `bulk_load`.
    pub inner_splits: u64,
    /// Times the root was replaced by a new inner node.
    pub root_splits: u64,
    /// Node pages fetched and decoded.
    pub node_reads: u64,
    /// Node pages encoded and written back to the pool.
    pub node_writes: u64,
}

/// Counters for one tree handle. Not persisted.
#[derive(Default, Debug)]
pub struct BTreeStats {
    leaf_splits: AtomicU64,
    inner_splits: AtomicU64,
    root_splits: AtomicU64,
    node_reads: AtomicU64,
    node_writes: AtomicU64,
}

impl BTreeStats {
    pub fn leaf_splits(&self) -> u64 {
        self.leaf_splits.load(Ordering::Relaxed)
    }

    pub fn inner_splits(&self) -> u64 {
        self.inner_splits.load(Ordering::Relaxed)
    }

    pub fn root_splits(&self) -> u64 {
        self.root_splits.load(Ordering::Relaxed)
    }

    pub fn node_reads(&self) -> u64 {
        self.node_reads.load(Ordering::Relaxed)
    }

    pub fn node_writes(&self) -> u64 {
        self.node_writes.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_leaf_splits(&self) {
        self.leaf_splits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_inner_splits(&self) {
        self.inner_splits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_root_splits(&self) {
        self.root_splits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_node_reads(&self) {
        self.node_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_node_writes(&self) {
        self.node_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BTreeStatsSnapshot {
        BTreeStatsSnapshot {
            leaf_splits: self.leaf_splits(),
            inner_splits: self.inner_splits(),
            root_splits: self.root_splits(),
            node_reads: self.node_reads(),
            node_writes: self.node_writes(),
        }
    }

    /// Log the current counters as one `info` event.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "pagedex::btree::stats",
            leaf_splits = snapshot.leaf_splits,
            inner_splits = snapshot.inner_splits,
            root_splits = snapshot.root_splits,
            node_reads = snapshot.node_reads,
            node_writes = snapshot.node_writes,
            "btree stats snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_feed_snapshot() {
        let stats = BTreeStats::default();
        stats.inc_leaf_splits();
        stats.inc_leaf_splits();
        stats.inc_root_splits();
        stats.inc_node_reads();

        let snap = stats.snapshot();
        assert_eq!(snap.leaf_splits, 2);
        assert_eq!(snap.inner_splits, 0);
        assert_eq!(snap.root_splits, 1);
        assert_eq!(snap.node_reads, 1);
        assert_eq!(snap.node_writes, 0);
    }
}
