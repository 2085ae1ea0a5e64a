//! Lazy, ascending range scans over the leaf chain.

use std::iter::FusedIterator;

use crate::common::{Error, PageId, Result};

use super::leaf::LeafNode;
use super::node::{Node, TreeContext};
use super::record_id::RecordId;

/// Yields record ids in ascending key order.
///
/// Only the remaining values of the current leaf are held in memory; the
/// next leaf is fetched when they run out, so each call to `next` costs at
/// most one page fetch unless it crosses empty leaves left behind by
/// removals. No page stays pinned between calls.
///
/// After an error the iterator yields `Err` once and then ends.
pub struct ScanIter<'a> {
    ctx: TreeContext<'a>,
    buffered: std::vec::IntoIter<RecordId>,
    next_leaf: Option<PageId>,
}

impl<'a> ScanIter<'a> {
    pub(crate) fn new(ctx: TreeContext<'a>, leaf: &LeafNode, values: Vec<RecordId>) -> Self {
        Self {
            ctx,
            buffered: values.into_iter(),
            next_leaf: leaf.right_sibling(),
        }
    }
}

impl Iterator for ScanIter<'_> {
    type Item = Result<RecordId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(rid) = self.buffered.next() {
                return Some(Ok(rid));
            }

            let page_id = self.next_leaf.take()?;
            match self.ctx.load(page_id) {
                Ok(Node::Leaf(leaf)) => {
                    self.next_leaf = leaf.right_sibling();
                    self.buffered = leaf.values_from(None).into_iter();
                }
                Ok(Node::Inner(_)) => {
                    return Some(Err(Error::corrupted(
                        page_id.0,
                        "leaf sibling link points at an inner node",
                    )));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl FusedIterator for ScanIter<'_> {}
