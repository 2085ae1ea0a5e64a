//! Inner nodes: n separator keys routing to n + 1 children.
//!
//! ```text
//! Body offset        Size          Field
//! -----------        ------------  -----
//! 0                  4             key count n
//! 4                  n * K         keys
//! 4 + n * K          (n + 1) * 4   child page ids
//! ```
//!
//! Child `i` holds keys in `[keys[i - 1], keys[i])`: a key equal to a
//! separator routes right.

use std::iter::Peekable;

use tracing::debug;

use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

use super::key::{Key, KeyType};
use super::node::{read_u32, write_u32, Split, TreeContext};
use super::record_id::RecordId;

const OFFSET_COUNT: usize = 0;
const OFFSET_KEYS: usize = 4;

/// Page header plus the key count.
pub const INNER_HEADER_SIZE: usize = PageHeader::SIZE + OFFSET_KEYS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerNode {
    page_id: PageId,
    keys: Vec<Key>,
    children: Vec<PageId>,
}

impl InnerNode {
    /// Largest d such that 2d keys and 2d + 1 children fit in one page.
    pub fn max_order(page_size: usize, key_type: KeyType) -> usize {
        let per_key = key_type.size_in_bytes() + PageId::ENCODED_SIZE;
        page_size.saturating_sub(INNER_HEADER_SIZE + PageId::ENCODED_SIZE) / per_key / 2
    }

    pub(crate) fn create(
        ctx: &TreeContext<'_>,
        keys: Vec<Key>,
        children: Vec<PageId>,
    ) -> Result<InnerNode> {
        ctx.allocate(
            |page_id| InnerNode {
                page_id,
                keys,
                children,
            },
            |inner, page| inner.encode(ctx.key_type, page),
        )
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn children(&self) -> &[PageId] {
        &self.children
    }

    /// Index of the first separator greater than `key`.
    fn child_index(&self, key: &Key) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    pub fn child_for(&self, key: &Key) -> PageId {
        self.children[self.child_index(key)]
    }

    pub fn leftmost_child(&self) -> PageId {
        self.children[0]
    }

    pub(crate) fn get(&self, ctx: &TreeContext<'_>, key: &Key) -> Result<Option<RecordId>> {
        ctx.load(self.child_for(key))?.get(ctx, key)
    }

    /// Insert into the owning child and absorb its split, splitting this
    /// node in turn when it overflows 2d keys.
    pub(crate) fn put(
        &mut self,
        ctx: &TreeContext<'_>,
        key: Key,
        rid: RecordId,
    ) -> Result<Option<Split>> {
        let idx = self.child_index(&key);
        let mut child = ctx.load(self.children[idx])?;
        let Some((separator, new_child)) = child.put(ctx, key, rid)? else {
            return Ok(None);
        };

        self.keys.insert(idx, separator);
        self.children.insert(idx + 1, new_child);
        if self.keys.len() <= ctx.capacity() {
            self.sync(ctx)?;
            return Ok(None);
        }
        self.split(ctx).map(Some)
    }

    pub(crate) fn remove(&mut self, ctx: &TreeContext<'_>, key: &Key) -> Result<Option<RecordId>> {
        ctx.load(self.child_for(key))?.remove(ctx, key)
    }

    /// Keep feeding the rightmost child while input remains, appending each
    /// split it reports and writing this node before reading more input.
    /// Returns a split once this node exceeds 2d keys.
    pub(crate) fn bulk_load<I>(
        &mut self,
        ctx: &TreeContext<'_>,
        data: &mut Peekable<I>,
        leaf_fill: usize,
    ) -> Result<Option<Split>>
    where
        I: Iterator<Item = (Key, RecordId)>,
    {
        while data.peek().is_some() {
            let rightmost = *self
                .children
                .last()
                .ok_or_else(|| Error::corrupted(self.page_id.0, "inner node has no children"))?;
            let mut child = ctx.load(rightmost)?;

            if let Some((separator, new_child)) = child.bulk_load(ctx, data, leaf_fill)? {
                self.keys.push(separator);
                self.children.push(new_child);
                if self.keys.len() > ctx.capacity() {
                    return self.split(ctx).map(Some);
                }
                // The child already links the new page into the leaf chain.
                self.sync(ctx)?;
            }
        }
        Ok(None)
    }

    /// Keep d keys and d + 1 children, push up key d, move the rest to a
    /// new right sibling.
    fn split(&mut self, ctx: &TreeContext<'_>) -> Result<Split> {
        let d = ctx.order;
        let moved_keys = self.keys.split_off(d + 1);
        let separator = self.keys.remove(d);
        let moved_children = self.children.split_off(d + 1);

        let sibling = InnerNode::create(ctx, moved_keys, moved_children)?;
        self.sync(ctx)?;

        ctx.stats.inc_inner_splits();
        debug!(
            page_id = self.page_id.0,
            sibling = sibling.page_id.0,
            separator = %separator,
            "btree.inner.split"
        );
        Ok((separator, sibling.page_id))
    }

    pub(crate) fn sync(&self, ctx: &TreeContext<'_>) -> Result<()> {
        ctx.store(self.page_id, |page| self.encode(ctx.key_type, page))
    }

    pub(crate) fn encode(&self, key_type: KeyType, page: &mut Page) -> Result<()> {
        let key_size = key_type.size_in_bytes();
        let n = self.keys.len();
        let children_at = OFFSET_KEYS + n * key_size;
        let body = page.body_mut();

        if self.children.len() != n + 1 {
            return Err(Error::InvalidOperation(format!(
                "inner node {} has {} keys but {} children",
                self.page_id,
                n,
                self.children.len()
            )));
        }
        if children_at + (n + 1) * PageId::ENCODED_SIZE > body.len() {
            return Err(Error::InvalidOperation(format!(
                "inner node {} with {} keys does not fit in a page",
                self.page_id, n
            )));
        }

        write_u32(body, OFFSET_COUNT, n as u32);
        for (i, key) in self.keys.iter().enumerate() {
            let at = OFFSET_KEYS + i * key_size;
            key.encode_into(key_type, &mut body[at..at + key_size]);
        }
        for (i, child) in self.children.iter().enumerate() {
            PageId::write_le(body, children_at + i * PageId::ENCODED_SIZE, child.0);
        }
        page.seal(PageType::BTreeInternal);
        Ok(())
    }

    pub(crate) fn decode(key_type: KeyType, page_id: PageId, page: &Page) -> Result<InnerNode> {
        let key_size = key_type.size_in_bytes();
        let body = page.body();

        let n = read_u32(body, OFFSET_COUNT) as usize;
        let max_keys = (body.len() - OFFSET_KEYS - PageId::ENCODED_SIZE) / (key_size + PageId::ENCODED_SIZE);
        if n > max_keys {
            return Err(Error::corrupted(
                page_id.0,
                format!("inner key count {} exceeds page capacity", n),
            ));
        }

        let mut keys = Vec::with_capacity(n);
        for i in 0..n {
            let at = OFFSET_KEYS + i * key_size;
            let key = Key::decode(key_type, &body[at..at + key_size])
                .ok_or_else(|| Error::corrupted(page_id.0, format!("undecodable key {}", i)))?;
            keys.push(key);
        }

        let children_at = OFFSET_KEYS + n * key_size;
        let mut children = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let raw = PageId::read_le(body, children_at + i * PageId::ENCODED_SIZE);
            let child = PageId::from_raw(raw)
                .ok_or_else(|| Error::corrupted(page_id.0, format!("child {} is the invalid page id", i)))?;
            children.push(child);
        }

        Ok(InnerNode {
            page_id,
            keys,
            children,
        })
    }

    /// `(child key child ... key child)` with children rendered recursively.
    pub(crate) fn to_sexp(&self, ctx: &TreeContext<'_>) -> Result<String> {
        let mut parts = Vec::with_capacity(self.keys.len() * 2 + 1);
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                parts.push(self.keys[i - 1].to_string());
            }
            parts.push(ctx.load(*child)?.to_sexp(ctx)?);
        }
        Ok(format!("({})", parts.join(" ")))
    }

    pub(crate) fn to_dot(&self, ctx: &TreeContext<'_>, out: &mut Vec<String>) -> Result<()> {
        let mut fields = Vec::with_capacity(self.keys.len() * 2 + 1);
        for i in 0..self.children.len() {
            if i > 0 {
                fields.push(self.keys[i - 1].to_string());
            }
            fields.push(format!("<f{}>", i));
        }
        out.push(format!("  node_{}[label = \"{}\"];", self.page_id.0, fields.join("|")));

        for (i, child) in self.children.iter().enumerate() {
            out.push(format!(
                "  \"node_{}\":f{} -> \"node_{}\";",
                self.page_id.0, i, child.0
            ));
            ctx.load(*child)?.to_dot(ctx, out)?;
        }
        Ok(())
    }
}
