//! The tree handle.

use std::sync::Arc;

use tracing::{debug, info};

use crate::buffer::BufferPoolManager;
use crate::common::{Error, PageId, Result};
use crate::concurrency::LockContext;

use super::inner::InnerNode;
use super::iter::ScanIter;
use super::key::{Key, KeyType};
use super::leaf::LeafNode;
use super::metadata::{self, BPlusTreeConfig, BPlusTreeMetadata};
use super::node::{Node, Split, TreeContext};
use super::record_id::RecordId;
use super::stats::BTreeStats;
use super::verify::{self, TreeShape};

/// A disk-resident B+ tree mapping unique keys to record ids.
///
/// The tree owns nothing but its metadata: every node lives in a page of
/// the shared [`BufferPoolManager`] and is fetched, decoded and unpinned on
/// each visit.
///
/// Deletes never rebalance. Leaves may become underfull or empty, and the
/// height never shrinks.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use pagedex::{BPlusTree, BPlusTreeConfig, BufferPoolManager, DiskManager, Key, KeyType, NoopLockContext, PageId, RecordId};
///
/// let bpm = Arc::new(BufferPoolManager::new(64, DiskManager::in_memory()));
/// let mut tree = BPlusTree::create(bpm, BPlusTreeConfig::new(KeyType::Int), Arc::new(NoopLockContext)).unwrap();
///
/// let rid = RecordId::new(PageId::new(3), 1);
/// tree.put(Key::Int(7), rid).unwrap();
/// assert_eq!(tree.get(&Key::Int(7)).unwrap(), Some(rid));
/// ```
pub struct BPlusTree {
    bpm: Arc<BufferPoolManager>,
    locks: Arc<dyn LockContext>,
    meta_page_id: PageId,
    metadata: BPlusTreeMetadata,
    stats: BTreeStats,
}

fn context<'a>(
    bpm: &'a BufferPoolManager,
    locks: &'a dyn LockContext,
    stats: &'a BTreeStats,
    metadata: &BPlusTreeMetadata,
) -> TreeContext<'a> {
    TreeContext {
        bpm,
        locks,
        stats,
        key_type: metadata.key_type,
        order: metadata.order,
    }
}

impl BPlusTree {
    /// Largest order whose nodes fit in a page of `page_size` bytes.
    pub fn max_order(page_size: usize, key_type: KeyType) -> usize {
        metadata::max_order(page_size, key_type)
    }

    /// Allocate a metadata page and an empty root leaf.
    pub fn create(
        bpm: Arc<BufferPoolManager>,
        config: BPlusTreeConfig,
        locks: Arc<dyn LockContext>,
    ) -> Result<Self> {
        let order = config.resolve_order()?;
        let metadata = BPlusTreeMetadata {
            key_type: config.key_type,
            order,
            root_page_id: PageId::INVALID,
            height: 0,
        };
        let meta_page_id = {
            let mut guard = bpm.new_page()?;
            metadata.encode(&mut guard);
            guard.page_id()
        };

        info!(
            meta_page_id = meta_page_id.0,
            key_type = %config.key_type,
            order,
            "btree.create"
        );
        Self::open(bpm, meta_page_id, locks)
    }

    /// Reopen a tree from its metadata page. A tree whose root was never
    /// written gets an empty root leaf.
    pub fn open(
        bpm: Arc<BufferPoolManager>,
        meta_page_id: PageId,
        locks: Arc<dyn LockContext>,
    ) -> Result<Self> {
        let metadata = BPlusTreeMetadata::load(&bpm, meta_page_id)?;
        let mut tree = Self {
            bpm,
            locks,
            meta_page_id,
            metadata,
            stats: BTreeStats::default(),
        };

        if !tree.metadata.root_page_id.is_valid() {
            let ctx = context(&tree.bpm, &*tree.locks, &tree.stats, &tree.metadata);
            let root = LeafNode::create(&ctx, Vec::new(), None)?;
            let updated = BPlusTreeMetadata {
                root_page_id: root.page_id(),
                height: 0,
                ..tree.metadata
            };
            updated.store(&tree.bpm, meta_page_id)?;
            tree.metadata = updated;
        }

        info!(
            meta_page_id = meta_page_id.0,
            root = tree.metadata.root_page_id.0,
            height = tree.metadata.height,
            "btree.open"
        );
        Ok(tree)
    }

    pub fn meta_page_id(&self) -> PageId {
        self.meta_page_id
    }

    pub fn metadata(&self) -> &BPlusTreeMetadata {
        &self.metadata
    }

    pub fn key_type(&self) -> KeyType {
        self.metadata.key_type
    }

    pub fn order(&self) -> usize {
        self.metadata.order
    }

    /// Edges from the root to any leaf; 0 while the root is a leaf.
    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    pub fn root_page_id(&self) -> PageId {
        self.metadata.root_page_id
    }

    pub fn stats(&self) -> &BTreeStats {
        &self.stats
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    fn ctx(&self) -> TreeContext<'_> {
        context(&self.bpm, &*self.locks, &self.stats, &self.metadata)
    }

    fn load_root(&self) -> Result<Node> {
        self.ctx().load(self.metadata.root_page_id)
    }

    /// Look up `key`. A missing key is `Ok(None)`.
    pub fn get(&self, key: &Key) -> Result<Option<RecordId>> {
        key.check(self.metadata.key_type)?;
        let ctx = self.ctx();
        ctx.load(self.metadata.root_page_id)?.get(&ctx, key)
    }

    /// Insert `key`, replacing the record id of an existing entry.
    pub fn put(&mut self, key: Key, rid: RecordId) -> Result<()> {
        key.check(self.metadata.key_type)?;
        let ctx = context(&self.bpm, &*self.locks, &self.stats, &self.metadata);
        let mut root = ctx.load(self.metadata.root_page_id)?;

        if let Some(split) = root.put(&ctx, key, rid)? {
            Self::grow_root(&ctx, &mut self.metadata, self.meta_page_id, split)?;
        }
        Ok(())
    }

    /// Remove `key`, returning its record id if it was present.
    pub fn remove(&mut self, key: &Key) -> Result<Option<RecordId>> {
        key.check(self.metadata.key_type)?;
        let ctx = self.ctx();
        ctx.load(self.metadata.root_page_id)?.remove(&ctx, key)
    }

    /// Load pre-sorted, duplicate-free entries into a tree whose root is
    /// still a leaf, packing leaves to `fill_factor` of 2d and inner nodes
    /// to 2d.
    ///
    /// Fails with [`Error::InvalidOperation`] before touching any page if
    /// the root is an inner node. Unsorted input is not detected.
    pub fn bulk_load<I>(&mut self, data: I, fill_factor: f32) -> Result<()>
    where
        I: IntoIterator<Item = (Key, RecordId)>,
    {
        if !(fill_factor > 0.0 && fill_factor <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "fill factor {} is outside (0, 1]",
                fill_factor
            )));
        }

        let ctx = context(&self.bpm, &*self.locks, &self.stats, &self.metadata);
        let mut root = ctx.load(self.metadata.root_page_id)?;
        if let Node::Inner(_) = root {
            return Err(Error::InvalidOperation(
                "bulk load requires a tree whose root is a leaf".to_string(),
            ));
        }

        let leaf_fill = ((fill_factor * ctx.capacity() as f32).floor() as usize).max(1);
        let mut data = data.into_iter().peekable();
        while let Some(split) = root.bulk_load(&ctx, &mut data, leaf_fill)? {
            let new_root = Self::grow_root(&ctx, &mut self.metadata, self.meta_page_id, split)?;
            root = Node::Inner(new_root);
        }

        debug!(
            root = self.metadata.root_page_id.0,
            height = self.metadata.height,
            leaf_fill,
            "btree.bulk_load"
        );
        Ok(())
    }

    /// Replace the root with a new inner node over the old root and its
    /// split sibling, and persist the new root and height.
    fn grow_root(
        ctx: &TreeContext<'_>,
        metadata: &mut BPlusTreeMetadata,
        meta_page_id: PageId,
        (separator, right): Split,
    ) -> Result<InnerNode> {
        let old_root = metadata.root_page_id;
        let new_root = InnerNode::create(ctx, vec![separator], vec![old_root, right])?;
        let updated = BPlusTreeMetadata {
            root_page_id: new_root.page_id(),
            height: metadata.height + 1,
            ..*metadata
        };
        updated.store(ctx.bpm, meta_page_id)?;
        *metadata = updated;

        ctx.stats.inc_root_splits();
        debug!(
            old_root = old_root.0,
            root = new_root.page_id().0,
            height = metadata.height,
            "btree.root.split"
        );
        Ok(new_root)
    }

    /// Every record id in ascending key order.
    pub fn scan_all(&self) -> Result<ScanIter<'_>> {
        let ctx = self.ctx();
        let leaf = ctx.find_leaf(self.metadata.root_page_id, None)?;
        let values = leaf.values_from(None);
        Ok(ScanIter::new(ctx, &leaf, values))
    }

    /// Record ids of every key `>= key`, in ascending key order.
    pub fn scan_greater_equal(&self, key: &Key) -> Result<ScanIter<'_>> {
        key.check(self.metadata.key_type)?;
        let ctx = self.ctx();
        let leaf = ctx.find_leaf(self.metadata.root_page_id, Some(key))?;
        let values = leaf.values_from(Some(key));
        Ok(ScanIter::new(ctx, &leaf, values))
    }

    /// S-expression rendering of the whole tree.
    ///
    /// A leaf is `((k (p s)) ...)`; an inner node is
    /// `(child key child ... key child)`. An empty tree is `()`.
    pub fn to_sexp(&self) -> Result<String> {
        let ctx = self.ctx();
        self.load_root()?.to_sexp(&ctx)
    }

    /// Graphviz `digraph` of the whole tree.
    pub fn to_dot(&self) -> Result<String> {
        let ctx = self.ctx();
        let mut lines = vec![
            "digraph g {".to_string(),
            "  node [shape=record, height=0.1];".to_string(),
        ];
        self.load_root()?.to_dot(&ctx, &mut lines)?;
        lines.push("}".to_string());
        Ok(lines.join("\n"))
    }

    /// Walk every node and check the structural invariants. Returns the
    /// tree's shape, or [`Error::Corrupted`] naming the first bad page.
    pub fn verify(&self) -> Result<TreeShape> {
        verify::verify_tree(&self.ctx(), self.metadata.root_page_id, self.metadata.height)
    }
}

impl std::fmt::Debug for BPlusTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BPlusTree")
            .field("meta_page_id", &self.meta_page_id)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::NoopLockContext;
    use crate::storage::DiskManager;

    fn rid(n: i32) -> RecordId {
        RecordId::new(PageId::new(n as u32), n as u16)
    }

    fn tree(order: usize) -> BPlusTree {
        let bpm = Arc::new(BufferPoolManager::new(64, DiskManager::in_memory()));
        BPlusTree::create(
            bpm,
            BPlusTreeConfig::new(KeyType::Int).with_order(order),
            Arc::new(NoopLockContext),
        )
        .unwrap()
    }

    #[test]
    fn test_create_empty() {
        let tree = tree(2);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.to_sexp().unwrap(), "()");
        assert_eq!(tree.get(&Key::Int(1)).unwrap(), None);
        assert_eq!(tree.scan_all().unwrap().count(), 0);
    }

    #[test]
    fn test_root_split_grows_height() {
        let mut tree = tree(1);
        for k in 1..=3 {
            tree.put(Key::Int(k), rid(k)).unwrap();
        }

        assert_eq!(tree.height(), 1);
        assert_eq!(tree.stats().root_splits(), 1);
        assert_eq!(
            tree.to_sexp().unwrap(),
            "(((1 (1 1))) 2 ((2 (2 2)) (3 (3 3))))"
        );
    }

    #[test]
    fn test_key_type_is_enforced() {
        let mut tree = tree(2);
        assert!(matches!(
            tree.put(Key::Long(1), rid(1)),
            Err(Error::KeyTypeMismatch { .. })
        ));
        assert!(tree.get(&Key::from("x")).is_err());
        assert!(tree.scan_greater_equal(&Key::Bool(true)).is_err());
    }

    #[test]
    fn test_bulk_load_rejects_bad_fill() {
        let mut tree = tree(2);
        for fill in [0.0, -0.5, 1.5, f32::NAN] {
            assert!(matches!(
                tree.bulk_load(Vec::<(Key, RecordId)>::new(), fill),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_to_dot() {
        let mut tree = tree(1);
        for k in 1..=3 {
            tree.put(Key::Int(k), rid(k)).unwrap();
        }
        let dot = tree.to_dot().unwrap();

        assert!(dot.starts_with("digraph g {"));
        assert!(dot.ends_with('}'));
        assert!(dot.contains("<f0>|2|<f1>"));
        assert_eq!(dot.matches("->").count(), 2);
    }
}
