//! Node dispatch and page access shared by leaves and inner nodes.

use std::iter::Peekable;

use crate::buffer::{BufferPoolManager, PageReadGuard};
use crate::common::{PageId, Result};
use crate::concurrency::{LockContext, LockMode, NodeLock};
use crate::storage::page::{Page, PageType};

use super::inner::InnerNode;
use super::key::{Key, KeyType};
use super::leaf::LeafNode;
use super::record_id::RecordId;
use super::stats::BTreeStats;

/// A separator key and the page id of the new right sibling produced by a
/// split. The caller links the sibling in as the child right of the key.
pub(crate) type Split = (Key, PageId);

/// Everything a node operation needs besides the node itself.
#[derive(Clone, Copy)]
pub(crate) struct TreeContext<'a> {
    pub bpm: &'a BufferPoolManager,
    pub locks: &'a dyn LockContext,
    pub stats: &'a BTreeStats,
    pub key_type: KeyType,
    pub order: usize,
}

impl TreeContext<'_> {
    /// 2d: the most entries a leaf (or keys an inner node) may hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        2 * self.order
    }

    /// Fetch, verify and decode the node stored at `page_id`.
    ///
    /// The page is unpinned before this returns.
    pub fn load(&self, page_id: PageId) -> Result<Node> {
        let _lock = NodeLock::acquire(self.locks, page_id, LockMode::Shared)?;
        let guard = self.bpm.fetch_page_read(page_id)?;
        self.stats.inc_node_reads();
        Node::decode(self.key_type, &guard)
    }

    /// Overwrite the page at `page_id` with `encode`'s output.
    pub fn store<F>(&self, page_id: PageId, encode: F) -> Result<()>
    where
        F: FnOnce(&mut Page) -> Result<()>,
    {
        let _lock = NodeLock::acquire(self.locks, page_id, LockMode::Exclusive)?;
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        encode(&mut *guard)?;
        self.stats.inc_node_writes();
        Ok(())
    }

    /// Allocate a fresh page, build a node for its id and write it.
    pub fn allocate<T, B, E>(&self, build: B, encode: E) -> Result<T>
    where
        B: FnOnce(PageId) -> T,
        E: FnOnce(&T, &mut Page) -> Result<()>,
    {
        let mut guard = self.bpm.new_page()?;
        let node = build(guard.page_id());
        let _lock = NodeLock::acquire(self.locks, guard.page_id(), LockMode::Exclusive)?;
        encode(&node, &mut *guard)?;
        self.stats.inc_node_writes();
        Ok(node)
    }

    /// Descend from `root` to the leaf that owns `key`, or to the leftmost
    /// leaf when `key` is `None`.
    pub fn find_leaf(&self, root: PageId, key: Option<&Key>) -> Result<LeafNode> {
        let mut page_id = root;
        loop {
            match self.load(page_id)? {
                Node::Leaf(leaf) => return Ok(leaf),
                Node::Inner(inner) => {
                    page_id = match key {
                        Some(key) => inner.child_for(key),
                        None => inner.leftmost_child(),
                    };
                }
            }
        }
    }
}

/// A decoded tree node.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf(LeafNode),
    Inner(InnerNode),
}

impl Node {
    pub fn decode(key_type: KeyType, guard: &PageReadGuard<'_>) -> Result<Node> {
        let page_id = guard.page_id();
        match guard.sealed_as(&[PageType::BTreeLeaf, PageType::BTreeInternal])? {
            PageType::BTreeLeaf => LeafNode::decode(key_type, page_id, guard).map(Node::Leaf),
            _ => InnerNode::decode(key_type, page_id, guard).map(Node::Inner),
        }
    }

    pub fn get(&self, ctx: &TreeContext<'_>, key: &Key) -> Result<Option<RecordId>> {
        match self {
            Node::Leaf(leaf) => Ok(leaf.get(key)),
            Node::Inner(inner) => inner.get(ctx, key),
        }
    }

    pub fn put(&mut self, ctx: &TreeContext<'_>, key: Key, rid: RecordId) -> Result<Option<Split>> {
        match self {
            Node::Leaf(leaf) => leaf.put(ctx, key, rid),
            Node::Inner(inner) => inner.put(ctx, key, rid),
        }
    }

    pub fn remove(&mut self, ctx: &TreeContext<'_>, key: &Key) -> Result<Option<RecordId>> {
        match self {
            Node::Leaf(leaf) => leaf.remove(ctx, key),
            Node::Inner(inner) => inner.remove(ctx, key),
        }
    }

    pub fn bulk_load<I>(
        &mut self,
        ctx: &TreeContext<'_>,
        data: &mut Peekable<I>,
        leaf_fill: usize,
    ) -> Result<Option<Split>>
    where
        I: Iterator<Item = (Key, RecordId)>,
    {
        match self {
            Node::Leaf(leaf) => leaf.bulk_load(ctx, data, leaf_fill),
            Node::Inner(inner) => inner.bulk_load(ctx, data, leaf_fill),
        }
    }

    pub fn to_sexp(&self, ctx: &TreeContext<'_>) -> Result<String> {
        match self {
            Node::Leaf(leaf) => Ok(leaf.to_sexp()),
            Node::Inner(inner) => inner.to_sexp(ctx),
        }
    }

    /// Append Graphviz node and edge lines for this subtree.
    pub fn to_dot(&self, ctx: &TreeContext<'_>, out: &mut Vec<String>) -> Result<()> {
        match self {
            Node::Leaf(leaf) => {
                out.push(leaf.dot_label());
                Ok(())
            }
            Node::Inner(inner) => inner.to_dot(ctx, out),
        }
    }
}

/// Read a little-endian u32 count or offset.
#[inline]
pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
