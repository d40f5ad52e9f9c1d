//! Memory map for visualization.
//!
//! Flattens the current leaves into address-ordered segments that a display
//! layer can draw proportionally. Buddies share a `buddy_base`, which is the
//! address of their common parent, so they can be given the same color.

use alloc::string::String;
use alloc::vec::Vec;

use crate::buddy::BuddyAllocator;

/// One contiguous leaf of the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub address: usize,
    pub size: usize,
    pub owner: Option<String>,
    pub occupied_bytes: usize,
    pub wasted: usize,
    /// `min(address, address ^ size)`
    pub buddy_base: usize,
}

impl Segment {
    pub fn is_occupied(&self) -> bool {
        self.owner.is_some()
    }

    pub const fn end(&self) -> usize {
        self.address + self.size
    }

    /// Display group key: buddies share it, blocks of other sizes never do
    pub const fn buddy_group(&self) -> (usize, usize) {
        (self.buddy_base, self.size)
    }

    /// Share of the arena covered by this segment, in parts per thousand
    ///
    /// Computed in `u128` so arenas near `usize::MAX` do not overflow; an
    /// empty `total_size` reads as one byte.
    pub const fn permille_of(&self, total_size: usize) -> usize {
        let total = if total_size == 0 { 1 } else { total_size };
        (self.size as u128 * 1000 / total as u128) as usize
    }
}

/// Segments for every leaf, lowest address first
pub fn memory_map(allocator: &BuddyAllocator) -> Vec<Segment> {
    allocator
        .leaf_nodes()
        .into_iter()
        .map(|node| Segment {
            address: node.address(),
            size: node.size(),
            owner: node.owner().map(String::from),
            occupied_bytes: node.requested_size(),
            wasted: node.wasted(),
            buddy_base: crate::buddy_base(node.address(), node.size()),
        })
        .collect()
}
