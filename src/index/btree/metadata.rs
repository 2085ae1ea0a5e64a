//! Tree metadata page and creation-time configuration.
//!
//! The metadata page is the tree's only fixed entry point: everything else
//! is reached from the root page id it stores.
//!
//! ```text
//! Body offset  Size  Field
//! -----------  ----  -----
//! 0            1     key type tag
//! 1            2     string key width (0 for fixed types)
//! 3            4     order d
//! 7            4     root page id (u32::MAX if not yet created)
//! 11           4     height (0 = root is a leaf)
//! ```

use crate::buffer::BufferPoolManager;
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageType};

use super::inner::InnerNode;
use super::key::KeyType;
use super::leaf::LeafNode;
use super::node::{read_u32, write_u32};

const OFFSET_KEY_TAG: usize = 0;
const OFFSET_KEY_WIDTH: usize = 1;
const OFFSET_ORDER: usize = 3;
const OFFSET_ROOT: usize = 7;
const OFFSET_HEIGHT: usize = 11;

/// Largest order whose leaf and inner nodes both fit in a page of
/// `page_size` bytes.
pub fn max_order(page_size: usize, key_type: KeyType) -> usize {
    LeafNode::max_order(page_size, key_type).min(InnerNode::max_order(page_size, key_type))
}

/// Options for [`BPlusTree::create`](super::BPlusTree::create).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BPlusTreeConfig {
    pub key_type: KeyType,
    /// Order d. `None` picks the largest order that fits a page.
    pub order: Option<usize>,
}

impl BPlusTreeConfig {
    pub fn new(key_type: KeyType) -> Self {
        Self {
            key_type,
            order: None,
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    pub(crate) fn resolve_order(&self) -> Result<usize> {
        if self.key_type == KeyType::String(0) {
            return Err(Error::InvalidArgument(
                "string keys need a width of at least one byte".to_string(),
            ));
        }
        let limit = max_order(PAGE_SIZE, self.key_type);
        if limit == 0 {
            return Err(Error::InvalidArgument(format!(
                "{} keys are too wide for a {}-byte page",
                self.key_type, PAGE_SIZE
            )));
        }
        match self.order {
            None => Ok(limit),
            Some(order) if order == 0 || order > limit => Err(Error::InvalidArgument(format!(
                "order {} out of range 1..={} for {} keys",
                order, limit, self.key_type
            ))),
            Some(order) => Ok(order),
        }
    }
}

/// Persistent description of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BPlusTreeMetadata {
    pub key_type: KeyType,
    pub order: usize,
    pub root_page_id: PageId,
    /// Edges from the root to any leaf.
    pub height: u32,
}

impl BPlusTreeMetadata {
    pub(crate) fn encode(&self, page: &mut Page) {
        let body = page.body_mut();
        body[OFFSET_KEY_TAG] = self.key_type.tag();
        body[OFFSET_KEY_WIDTH..OFFSET_KEY_WIDTH + 2]
            .copy_from_slice(&self.key_type.width().to_le_bytes());
        write_u32(body, OFFSET_ORDER, self.order as u32);
        PageId::write_le(body, OFFSET_ROOT, self.root_page_id.0);
        write_u32(body, OFFSET_HEIGHT, self.height);
        page.seal(PageType::BTreeMeta);
    }

    /// Decode the body of a page already known to be an intact metadata page.
    pub(crate) fn decode(page_id: PageId, page: &Page) -> Result<Self> {
        let body = page.body();
        let width = u16::from_le_bytes([body[OFFSET_KEY_WIDTH], body[OFFSET_KEY_WIDTH + 1]]);
        let key_type = KeyType::from_tag(body[OFFSET_KEY_TAG], width)
            .ok_or_else(|| Error::corrupted(page_id.0, "unknown key type"))?;
        let order = read_u32(body, OFFSET_ORDER) as usize;
        if order == 0 || order > max_order(PAGE_SIZE, key_type) {
            return Err(Error::corrupted(
                page_id.0,
                format!("order {} invalid for {} keys", order, key_type),
            ));
        }

        Ok(Self {
            key_type,
            order,
            root_page_id: PageId(PageId::read_le(body, OFFSET_ROOT)),
            height: read_u32(body, OFFSET_HEIGHT),
        })
    }

    pub(crate) fn load(bpm: &BufferPoolManager, page_id: PageId) -> Result<Self> {
        let guard = bpm.fetch_page_read(page_id)?;
        guard.sealed_as(&[PageType::BTreeMeta])?;
        Self::decode(page_id, &guard)
    }

    pub(crate) fn store(&self, bpm: &BufferPoolManager, page_id: PageId) -> Result<()> {
        let mut guard = bpm.fetch_page_write(page_id)?;
        self.encode(&mut guard);
        Ok(())
    }
}
