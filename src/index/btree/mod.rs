//! Disk-resident B+ tree.
//!
//! # Layout
//! ```text
//!                    ┌──────────────┐
//!                    │ metadata page│  key type, order, root, height
//!                    └──────┬───────┘
//!                           ↓
//!                    ┌──────────────┐
//!                    │  inner (root)│  c0 k0 c1 k1 c2
//!                    └──┬────┬────┬─┘
//!              ┌────────┘    │    └────────┐
//!              ↓             ↓             ↓
//!          ┌───────┐     ┌───────┐     ┌───────┐
//!          │ leaf  │ ──→ │ leaf  │ ──→ │ leaf  │ ──→ none
//!          └───────┘     └───────┘     └───────┘
//! ```
//!
//! Every node occupies one page. Children and siblings are page ids, never
//! in-memory references: a node is fetched from the buffer pool, decoded,
//! and its page unpinned before any other node is visited.
//!
//! With order d, a leaf holds at most 2d entries and an inner node at most
//! 2d keys and 2d + 1 children. Inserts split on overflow; removes never
//! merge or redistribute.

mod inner;
mod iter;
mod key;
mod leaf;
mod metadata;
mod node;
mod record_id;
mod stats;
mod tree;
mod verify;

pub use inner::INNER_HEADER_SIZE;
pub use iter::ScanIter;
pub use key::{Key, KeyType};
pub use leaf::LEAF_HEADER_SIZE;
pub use metadata::{max_order, BPlusTreeConfig, BPlusTreeMetadata};
pub use record_id::RecordId;
pub use stats::{BTreeStats, BTreeStatsSnapshot};
pub use tree::BPlusTree;
pub use verify::TreeShape;
