//! Property tests: the tree against an in-memory `BTreeMap` model.

use std::collections::BTreeMap;
use std::sync::Arc;

use pagedex::{
    BPlusTree, BPlusTreeConfig, BufferPoolManager, DiskManager, Key, KeyType, NoopLockContext,
    PageId, RecordId,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    Put { key: i32, slot: u16 },
    Remove { key: i32 },
    Get { key: i32 },
    ScanFrom { key: i32 },
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (-200i32..200, any::<u16>()).prop_map(|(key, slot)| Operation::Put { key, slot }),
        2 => (-200i32..200).prop_map(|key| Operation::Remove { key }),
        1 => (-200i32..200).prop_map(|key| Operation::Get { key }),
        1 => (-220i32..220).prop_map(|key| Operation::ScanFrom { key }),
    ]
}

fn rid(key: i32, slot: u16) -> RecordId {
    RecordId::new(PageId::new(key as u32), slot)
}

fn new_tree(order: usize, pool_size: usize) -> BPlusTree {
    let bpm = Arc::new(BufferPoolManager::new(pool_size, DiskManager::in_memory()));
    BPlusTree::create(
        bpm,
        BPlusTreeConfig::new(KeyType::Int).with_order(order),
        Arc::new(NoopLockContext),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_matches_model(
        order in 1usize..=4,
        pool_size in 3usize..=32,
        ops in prop::collection::vec(arb_operation(), 1..300),
    ) {
        let mut tree = new_tree(order, pool_size);
        let mut model: BTreeMap<i32, RecordId> = BTreeMap::new();

        for op in ops {
            match op {
                Operation::Put { key, slot } => {
                    tree.put(Key::Int(key), rid(key, slot)).unwrap();
                    model.insert(key, rid(key, slot));
                }
                Operation::Remove { key } => {
                    prop_assert_eq!(tree.remove(&Key::Int(key)).unwrap(), model.remove(&key));
                }
                Operation::Get { key } => {
                    prop_assert_eq!(tree.get(&Key::Int(key)).unwrap(), model.get(&key).copied());
                }
                Operation::ScanFrom { key } => {
                    let got: Vec<RecordId> = tree
                        .scan_greater_equal(&Key::Int(key))
                        .unwrap()
                        .map(|r| r.unwrap())
                        .collect();
                    let want: Vec<RecordId> = model.range(key..).map(|(_, r)| *r).collect();
                    prop_assert_eq!(got, want);
                }
            }
        }

        let shape = tree.verify().unwrap();
        prop_assert_eq!(shape.entry_count, model.len());
        let all: Vec<RecordId> = tree.scan_all().unwrap().map(|r| r.unwrap()).collect();
        prop_assert_eq!(all, model.values().copied().collect::<Vec<_>>());
        prop_assert_eq!(tree.buffer_pool().pinned_frame_count(), 0);
    }

    #[test]
    fn prop_bulk_load_matches_input(
        order in 1usize..=4,
        fill in 0.1f32..=1.0,
        keys in prop::collection::btree_set(any::<i32>(), 0..400),
    ) {
        let mut tree = new_tree(order, 16);
        let data: Vec<(Key, RecordId)> = keys.iter().map(|&k| (Key::Int(k), rid(k, 0))).collect();
        tree.bulk_load(data, fill).unwrap();

        let shape = tree.verify().unwrap();
        prop_assert_eq!(shape.entry_count, keys.len());
        if shape.leaf_count > 1 {
            let leaf_fill = ((fill * (2 * order) as f32).floor() as usize).max(1);
            prop_assert!(shape.min_leaf_entries.unwrap_or(0) <= leaf_fill);
        }

        let all: Vec<RecordId> = tree.scan_all().unwrap().map(|r| r.unwrap()).collect();
        prop_assert_eq!(all, keys.iter().map(|&k| rid(k, 0)).collect::<Vec<_>>());
        for &k in keys.iter().take(20) {
            prop_assert_eq!(tree.get(&Key::Int(k)).unwrap(), Some(rid(k, 0)));
        }
    }
}
