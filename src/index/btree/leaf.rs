//! Leaf nodes: sorted (key, record id) entries plus a right-sibling link.
//!
//! ```text
//! Body offset  Size          Field
//! -----------  ------------  -----
//! 0            4             entry count n
//! 4            4             right sibling page id (u32::MAX = none)
//! 8            n * (K + 6)   entries: key (K bytes), record id (6 bytes)
//! ```

use std::iter::Peekable;

use tracing::debug;

use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

use super::key::{Key, KeyType};
use super::node::{read_u32, write_u32, Split, TreeContext};
use super::record_id::RecordId;

const OFFSET_COUNT: usize = 0;
const OFFSET_SIBLING: usize = 4;
const OFFSET_ENTRIES: usize = 8;

/// Page header plus the leaf's own fixed fields.
pub const LEAF_HEADER_SIZE: usize = PageHeader::SIZE + OFFSET_ENTRIES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    page_id: PageId,
    entries: Vec<(Key, RecordId)>,
    right_sibling: Option<PageId>,
}

impl LeafNode {
    /// Largest d such that 2d entries fit in one page.
    pub fn max_order(page_size: usize, key_type: KeyType) -> usize {
        let entry = key_type.size_in_bytes() + RecordId::SIZE;
        page_size.saturating_sub(LEAF_HEADER_SIZE) / entry / 2
    }

    /// Write a new leaf to a freshly allocated page.
    pub(crate) fn create(
        ctx: &TreeContext<'_>,
        entries: Vec<(Key, RecordId)>,
        right_sibling: Option<PageId>,
    ) -> Result<LeafNode> {
        ctx.allocate(
            |page_id| LeafNode {
                page_id,
                entries,
                right_sibling,
            },
            |leaf, page| leaf.encode(ctx.key_type, page),
        )
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn entries(&self) -> &[(Key, RecordId)] {
        &self.entries
    }

    pub fn right_sibling(&self) -> Option<PageId> {
        self.right_sibling
    }

    fn search(&self, key: &Key) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    pub fn get(&self, key: &Key) -> Option<RecordId> {
        self.search(key).ok().map(|i| self.entries[i].1)
    }

    /// Record ids of every entry whose key is `>= key`, in key order.
    pub fn values_from(&self, key: Option<&Key>) -> Vec<RecordId> {
        let start = match key {
            Some(key) => self.entries.partition_point(|(k, _)| k < key),
            None => 0,
        };
        self.entries[start..].iter().map(|(_, rid)| *rid).collect()
    }

    /// Insert or overwrite `key`. On overflow the upper d + 1 entries move to
    /// a new right sibling, whose first key is returned as the separator.
    pub(crate) fn put(
        &mut self,
        ctx: &TreeContext<'_>,
        key: Key,
        rid: RecordId,
    ) -> Result<Option<Split>> {
        match self.search(&key) {
            Ok(i) => self.entries[i].1 = rid,
            Err(i) => self.entries.insert(i, (key, rid)),
        }

        if self.entries.len() <= ctx.capacity() {
            self.sync(ctx)?;
            return Ok(None);
        }

        let moved = self.entries.split_off(ctx.order);
        let separator = moved[0].0.clone();
        let sibling = LeafNode::create(ctx, moved, self.right_sibling)?;
        self.right_sibling = Some(sibling.page_id);
        self.sync(ctx)?;

        ctx.stats.inc_leaf_splits();
        debug!(
            page_id = self.page_id.0,
            sibling = sibling.page_id.0,
            separator = %separator,
            "btree.leaf.split"
        );
        Ok(Some((separator, sibling.page_id)))
    }

    /// Remove `key` if present. The leaf may be left underfull or empty.
    pub(crate) fn remove(&mut self, ctx: &TreeContext<'_>, key: &Key) -> Result<Option<RecordId>> {
        match self.search(key) {
            Ok(i) => {
                let (_, rid) = self.entries.remove(i);
                self.sync(ctx)?;
                Ok(Some(rid))
            }
            Err(_) => Ok(None),
        }
    }

    /// Append entries from `data` until this leaf holds `fill` of them. If
    /// input remains, the next entry seeds a new right sibling which is
    /// returned as a split.
    pub(crate) fn bulk_load<I>(
        &mut self,
        ctx: &TreeContext<'_>,
        data: &mut Peekable<I>,
        fill: usize,
    ) -> Result<Option<Split>>
    where
        I: Iterator<Item = (Key, RecordId)>,
    {
        while self.entries.len() < fill {
            match data.next() {
                Some((key, rid)) => {
                    key.check(ctx.key_type)?;
                    self.entries.push((key, rid));
                }
                None => break,
            }
        }

        let split = match data.next() {
            Some((key, rid)) => {
                key.check(ctx.key_type)?;
                let separator = key.clone();
                let sibling = LeafNode::create(ctx, vec![(key, rid)], self.right_sibling)?;
                self.right_sibling = Some(sibling.page_id);
                Some((separator, sibling.page_id))
            }
            None => None,
        };

        self.sync(ctx)?;
        Ok(split)
    }

    pub(crate) fn sync(&self, ctx: &TreeContext<'_>) -> Result<()> {
        ctx.store(self.page_id, |page| self.encode(ctx.key_type, page))
    }

    pub(crate) fn encode(&self, key_type: KeyType, page: &mut Page) -> Result<()> {
        let key_size = key_type.size_in_bytes();
        let entry_size = key_size + RecordId::SIZE;
        let body = page.body_mut();
        if OFFSET_ENTRIES + self.entries.len() * entry_size > body.len() {
            return Err(Error::InvalidOperation(format!(
                "leaf {} with {} entries does not fit in a page",
                self.page_id,
                self.entries.len()
            )));
        }

        write_u32(body, OFFSET_COUNT, self.entries.len() as u32);
        PageId::write_le(body, OFFSET_SIBLING, PageId::to_raw(self.right_sibling));
        for (i, (key, rid)) in self.entries.iter().enumerate() {
            let at = OFFSET_ENTRIES + i * entry_size;
            key.encode_into(key_type, &mut body[at..at + key_size]);
            rid.encode_into(&mut body[at + key_size..at + entry_size]);
        }
        page.seal(PageType::BTreeLeaf);
        Ok(())
    }

    pub(crate) fn decode(key_type: KeyType, page_id: PageId, page: &Page) -> Result<LeafNode> {
        let key_size = key_type.size_in_bytes();
        let entry_size = key_size + RecordId::SIZE;
        let body = page.body();

        let count = read_u32(body, OFFSET_COUNT) as usize;
        if count > (body.len() - OFFSET_ENTRIES) / entry_size {
            return Err(Error::corrupted(
                page_id.0,
                format!("leaf entry count {} exceeds page capacity", count),
            ));
        }

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = OFFSET_ENTRIES + i * entry_size;
            let key = Key::decode(key_type, &body[at..at + key_size])
                .ok_or_else(|| Error::corrupted(page_id.0, format!("undecodable key at entry {}", i)))?;
            entries.push((key, RecordId::decode(&body[at + key_size..at + entry_size])));
        }

        Ok(LeafNode {
            page_id,
            entries,
            right_sibling: PageId::from_raw(PageId::read_le(body, OFFSET_SIBLING)),
        })
    }

    /// `((k (p s)) (k (p s)) ...)`, or `()` when empty.
    pub fn to_sexp(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(key, rid)| format!("({} {})", key, rid))
            .collect();
        format!("({})", parts.join(" "))
    }

    pub(crate) fn dot_label(&self) -> String {
        let keys: Vec<String> = self.entries.iter().map(|(key, _)| key.to_string()).collect();
        format!("  node_{}[label = \"{}\"];", self.page_id.0, keys.join("|"))
    }
}
