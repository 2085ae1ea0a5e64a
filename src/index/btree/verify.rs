//! Structural checks over a whole tree.

use crate::common::{Error, PageId, Result};

use super::key::Key;
use super::node::{Node, TreeContext};

/// Summary of a tree that passed [`BPlusTree::verify`](super::BPlusTree::verify).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeShape {
    pub height: u32,
    pub leaf_count: usize,
    pub inner_count: usize,
    pub entry_count: usize,
    /// Fewest entries in any non-root leaf.
    pub min_leaf_entries: Option<usize>,
    /// Fewest keys in any non-root inner node.
    pub min_inner_keys: Option<usize>,
}

#[derive(Default)]
struct Walk {
    shape: TreeShape,
    /// (leaf, its right sibling) in key order.
    leaves: Vec<(PageId, Option<PageId>)>,
}

pub(crate) fn verify_tree(ctx: &TreeContext<'_>, root: PageId, height: u32) -> Result<TreeShape> {
    let mut walk = Walk::default();
    walk.shape.height = height;
    visit(ctx, &mut walk, root, 0, None, None)?;

    for pair in walk.leaves.windows(2) {
        let (leaf, sibling) = pair[0];
        if sibling != Some(pair[1].0) {
            return Err(Error::corrupted(
                leaf.0,
                format!(
                    "sibling link {} does not match next leaf {}",
                    PageId::to_raw(sibling),
                    pair[1].0
                ),
            ));
        }
    }
    if let Some(&(last, sibling)) = walk.leaves.last() {
        if sibling.is_some() {
            return Err(Error::corrupted(last.0, "rightmost leaf has a sibling link"));
        }
    }

    Ok(walk.shape)
}

fn check_keys<'k>(
    page_id: PageId,
    keys: impl Iterator<Item = &'k Key>,
    lower: Option<&Key>,
    upper: Option<&Key>,
) -> Result<()> {
    let mut prev: Option<&Key> = None;
    for key in keys {
        if prev.is_some_and(|p| p >= key) {
            return Err(Error::corrupted(page_id.0, format!("key {} out of order", key)));
        }
        if lower.is_some_and(|l| key < l) || upper.is_some_and(|u| key >= u) {
            return Err(Error::corrupted(
                page_id.0,
                format!("key {} outside its separator bounds", key),
            ));
        }
        prev = Some(key);
    }
    Ok(())
}

fn fold_min(slot: &mut Option<usize>, value: usize) {
    *slot = Some(slot.map_or(value, |m| m.min(value)));
}

fn visit(
    ctx: &TreeContext<'_>,
    walk: &mut Walk,
    page_id: PageId,
    depth: u32,
    lower: Option<&Key>,
    upper: Option<&Key>,
) -> Result<()> {
    if depth > walk.shape.height {
        return Err(Error::corrupted(
            page_id.0,
            format!("node at depth {} below height {}", depth, walk.shape.height),
        ));
    }

    match ctx.load(page_id)? {
        Node::Leaf(leaf) => {
            if depth != walk.shape.height {
                return Err(Error::corrupted(
                    page_id.0,
                    format!("leaf at depth {}, expected {}", depth, walk.shape.height),
                ));
            }
            if leaf.entries().len() > ctx.capacity() {
                return Err(Error::corrupted(page_id.0, "leaf holds more than 2d entries"));
            }
            check_keys(page_id, leaf.entries().iter().map(|(k, _)| k), lower, upper)?;

            walk.shape.leaf_count += 1;
            walk.shape.entry_count += leaf.entries().len();
            if depth > 0 {
                fold_min(&mut walk.shape.min_leaf_entries, leaf.entries().len());
            }
            walk.leaves.push((page_id, leaf.right_sibling()));
        }
        Node::Inner(inner) => {
            if inner.keys().len() > ctx.capacity() {
                return Err(Error::corrupted(page_id.0, "inner node holds more than 2d keys"));
            }
            check_keys(page_id, inner.keys().iter(), lower, upper)?;

            walk.shape.inner_count += 1;
            if depth > 0 {
                fold_min(&mut walk.shape.min_inner_keys, inner.keys().len());
            }

            let keys = inner.keys();
            for (i, child) in inner.children().iter().enumerate() {
                let child_lower = if i == 0 { lower } else { Some(&keys[i - 1]) };
                let child_upper = keys.get(i).or(upper);
                visit(ctx, walk, *child, depth + 1, child_lower, child_upper)?;
            }
        }
    }
    Ok(())
}
