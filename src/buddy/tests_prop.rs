#![cfg(test)]
//! Property-based tests for the buddy tree
//!
//! Random interleavings of allocate/free must keep the tree consistent:
//! - leaves tile the arena in address order
//! - every node's address is aligned to its size, buddies sit at `A ^ S`
//! - each owner holds exactly one leaf
//! - no split goes below the minimum block size
//! - metrics match a sum over the leaves

extern crate std;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use proptest::prelude::*;

use super::{BlockNode, BuddyAllocator};
use crate::{buddy_address, normalize_size, AllocError};

#[derive(Debug, Clone)]
enum Op {
    Alloc { owner: u8, size: usize },
    Free { owner: u8 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..12, 1usize..=600).prop_map(|(owner, size)| Op::Alloc { owner, size }),
        2 => (0u8..12).prop_map(|owner| Op::Free { owner }),
    ]
}

fn owner_name(owner: u8) -> String {
    format!("P{}", owner)
}

/// Walk the whole tree and check the structural invariants
fn check_tree(allocator: &BuddyAllocator) -> Result<(), TestCaseError> {
    let mut stack = alloc::vec![(allocator.root(), None::<&BlockNode>)];
    while let Some((node, parent)) = stack.pop() {
        prop_assert!(node.size().is_power_of_two());
        prop_assert_eq!(node.address() % node.size(), 0);
        prop_assert!(node.size() >= allocator.min_block_size());
        if let Some(parent) = parent {
            prop_assert_eq!(node.size() * 2, parent.size());
            prop_assert_eq!(
                buddy_address(node.address(), node.size()) & !node.size(),
                parent.address()
            );
        }
        match node.children() {
            Some([left, right]) => {
                prop_assert!(!node.is_occupied());
                let left = allocator.node(left).expect("live left child");
                let right = allocator.node(right).expect("live right child");
                prop_assert_eq!(left.address(), node.address());
                prop_assert_eq!(right.address(), node.address() + node.size() / 2);
                stack.push((left, Some(node)));
                stack.push((right, Some(node)));
            }
            None => {
                prop_assert_eq!(node.is_occupied(), node.owner().is_some());
                prop_assert!(node.requested_size() <= node.size());
            }
        }
    }
    Ok(())
}

fn check_leaves(allocator: &BuddyAllocator) -> Result<(), TestCaseError> {
    let leaves = allocator.leaves_in_order();
    let mut cursor = 0;
    for leaf in &leaves {
        prop_assert_eq!(leaf.address, cursor);
        cursor += leaf.size;
    }
    prop_assert_eq!(cursor, allocator.total_size());

    let mut seen = BTreeMap::new();
    for node in allocator.leaf_nodes() {
        if let Some(owner) = node.owner() {
            *seen.entry(owner).or_insert(0usize) += 1;
        }
    }
    prop_assert!(seen.values().all(|&count| count == 1));

    let wasted: usize = leaves.iter().map(|leaf| leaf.wasted()).sum();
    let occupied: usize = leaves.iter().map(|leaf| leaf.occupied_bytes).sum();
    prop_assert_eq!(allocator.wasted_memory(), wasted);
    prop_assert_eq!(allocator.occupied_memory(), occupied);
    prop_assert_eq!(
        allocator.available_memory(),
        allocator.total_size() - occupied
    );
    Ok(())
}

/// Running statistics must agree with a recount over the leaves
#[cfg(feature = "tracking")]
fn check_stats(allocator: &BuddyAllocator) -> Result<(), TestCaseError> {
    let stats = allocator.get_stats();
    let mut recount = super::BuddyStats::new();
    recount.record_leaves(&allocator.leaves_in_order());
    prop_assert_eq!(stats.occupied_bytes, recount.occupied_bytes);
    prop_assert_eq!(stats.wasted_bytes, recount.wasted_bytes);
    prop_assert_eq!(stats.free_bytes, recount.free_bytes);
    prop_assert_eq!(&stats.free_blocks_by_size, &recount.free_blocks_by_size);
    prop_assert_eq!(&stats.used_blocks_by_size, &recount.used_blocks_by_size);
    Ok(())
}

proptest! {
    #[test]
    fn normalize_is_idempotent_power_of_two(n in 1usize..=(1usize << 40)) {
        let p = normalize_size(n).unwrap();
        prop_assert!(p.is_power_of_two());
        prop_assert!(p >= n);
        prop_assert!(p < 2 * n);
        prop_assert_eq!(normalize_size(p), Some(p));
    }

    #[test]
    fn random_ops_keep_tree_consistent(
        min_shift in 0u32..5,
        ops in proptest::collection::vec(arb_op(), 1..80),
    ) {
        let mut allocator = BuddyAllocator::new(1024, 1 << min_shift);
        let mut live: BTreeMap<u8, usize> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Alloc { owner, size } => {
                    let result = allocator.allocate(size, &owner_name(owner));
                    match (live.contains_key(&owner), result) {
                        (true, Err(err)) => prop_assert_eq!(err, AllocError::DuplicateOwner),
                        (true, Ok(_)) => prop_assert!(false, "duplicate owner accepted"),
                        (false, Ok(block)) => {
                            let expected = normalize_size(size)
                                .unwrap()
                                .max(allocator.min_block_size());
                            prop_assert_eq!(block.size, expected);
                            prop_assert_eq!(block.occupied_bytes, size);
                            live.insert(owner, size);
                        }
                        (false, Err(err)) => prop_assert_eq!(err, AllocError::NoSuitableBlock),
                    }
                }
                Op::Free { owner } => {
                    let result = allocator.free(&owner_name(owner));
                    match live.remove(&owner) {
                        Some(size) => prop_assert_eq!(result.map(|b| b.occupied_bytes), Ok(size)),
                        None => prop_assert_eq!(result, Err(AllocError::OwnerNotFound)),
                    }
                }
            }
            check_tree(&allocator)?;
            check_leaves(&allocator)?;
            #[cfg(feature = "tracking")]
            check_stats(&allocator)?;
        }

        // Releasing everyone collapses the tree back to the root
        let owners: Vec<u8> = live.keys().copied().collect();
        for owner in owners {
            allocator.free(&owner_name(owner)).unwrap();
        }
        prop_assert_eq!(allocator.leaf_count(), 1);
        prop_assert_eq!(allocator.wasted_memory(), 0);
    }

    #[test]
    fn alloc_then_free_restores_metrics(
        prefill in proptest::collection::vec(1usize..=200, 0..4),
        size in 1usize..=256,
    ) {
        let mut allocator = BuddyAllocator::new(1024, 1);
        for (i, bytes) in prefill.iter().enumerate() {
            let _ = allocator.allocate(*bytes, &format!("pre{}", i));
        }
        let wasted = allocator.wasted_memory();
        let occupied = allocator.occupied_memory();
        let leaves = allocator.leaves_in_order();

        if allocator.allocate(size, "X").is_ok() {
            allocator.free("X").unwrap();
        }
        prop_assert_eq!(allocator.wasted_memory(), wasted);
        prop_assert_eq!(allocator.occupied_memory(), occupied);
        prop_assert_eq!(allocator.leaves_in_order(), leaves);
    }
}
