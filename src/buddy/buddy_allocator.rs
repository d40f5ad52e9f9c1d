//! Tree-based buddy allocator
//!
//! The arena is a binary tree of power-of-two blocks. Allocation walks the
//! tree left-first, splitting free leaves down to the requested size (but
//! never below the minimum block size); freeing clears the owner's leaf and
//! merges free buddies back into their parent, bottom-up.

use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use crate::{normalize_size, AllocError, AllocResult, OwnerAllocator};

#[cfg(feature = "log")]
use log::{debug, trace, warn};

use super::block_node::{BlockHandle, BlockNode, NodeId};
use super::node_arena::{ArenaStats, NodeArena};

#[cfg(feature = "tracking")]
use super::stats::{BuddyStats, MemoryStatsReporter};

/// Default arena size in bytes
pub const DEFAULT_TOTAL_SIZE: usize = 1024;
/// Default split floor in bytes
pub const DEFAULT_MIN_BLOCK_SIZE: usize = 1;

/// Largest power of two representable in a `usize`
const MAX_ARENA_SIZE: usize = 1usize << (usize::BITS - 1);

/// Construction parameters for [`BuddyAllocator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyConfig {
    /// Arena capacity; rounded up to a power of two
    pub total_size: usize,
    /// Blocks are never split below this size; rounded up to a power of two
    /// and clamped to `total_size`
    pub min_block_size: usize,
}

impl BuddyConfig {
    pub const fn new(total_size: usize, min_block_size: usize) -> Self {
        Self {
            total_size,
            min_block_size,
        }
    }
}

impl Default for BuddyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_SIZE, DEFAULT_MIN_BLOCK_SIZE)
    }
}

/// Buddy allocator over an abstract arena
///
/// Blocks are integer ranges `[address, address + size)` inside
/// `[0, total_size)`; no real memory backs them. Each occupied leaf belongs to
/// exactly one owner id.
#[derive(Debug, Clone)]
pub struct BuddyAllocator {
    total_size: usize,
    min_block_size: usize,
    root: NodeId,
    nodes: NodeArena,
    #[cfg(feature = "tracking")]
    stats: BuddyStats,
}

impl BuddyAllocator {
    /// Create an allocator with `total_size` bytes split no further than
    /// `min_block_size`.
    ///
    /// Both sizes are rounded up to powers of two. A floor larger than the
    /// arena is clamped to the arena size.
    pub fn new(total_size: usize, min_block_size: usize) -> Self {
        let total_size = normalize_size(total_size).unwrap_or(MAX_ARENA_SIZE);
        let mut min_block_size = normalize_size(min_block_size).unwrap_or(MAX_ARENA_SIZE);
        if min_block_size > total_size {
            warn!(
                "buddy allocator: min block size {} exceeds total size {}, clamping",
                min_block_size, total_size
            );
            min_block_size = total_size;
        }

        let mut nodes = NodeArena::new();
        let root = nodes.insert(BlockNode::new(total_size, 0, None));

        Self {
            total_size,
            min_block_size,
            root,
            nodes,
            #[cfg(feature = "tracking")]
            stats: BuddyStats::for_arena(total_size),
        }
    }

    /// Create an allocator from a [`BuddyConfig`]
    pub fn with_config(config: BuddyConfig) -> Self {
        Self::new(config.total_size, config.min_block_size)
    }

    pub const fn total_size(&self) -> usize {
        self.total_size
    }

    pub const fn min_block_size(&self) -> usize {
        self.min_block_size
    }

    /// The root node (always `total_size` bytes at address 0)
    pub fn root(&self) -> &BlockNode {
        &self.nodes[self.root]
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&BlockNode> {
        self.nodes.get(id)
    }

    /// Get node arena statistics
    pub fn get_arena_stats(&self) -> ArenaStats {
        self.nodes.get_stats()
    }

    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> &BuddyStats {
        &self.stats
    }

    /// Allocate a block holding `requested` bytes for `owner`.
    ///
    /// The request is rounded up to a power of two and placed in the
    /// lowest-addressed free leaf that fits, splitting leaves on the way.
    /// When the split floor forbids going further, the whole leaf is taken and
    /// the excess counts as waste.
    pub fn allocate(&mut self, requested: usize, owner: &str) -> AllocResult<BlockHandle> {
        if owner.is_empty() {
            debug!("buddy allocator: rejecting request with empty owner id");
            return Err(AllocError::InvalidOwnerId);
        }
        if requested == 0 {
            debug!("buddy allocator: rejecting zero-byte request for {}", owner);
            return Err(AllocError::InvalidSize);
        }
        if self.find_owner(owner).is_some() {
            debug!("buddy allocator: owner {} already holds a block", owner);
            return Err(AllocError::DuplicateOwner);
        }

        let need = match normalize_size(requested) {
            Some(need) if need <= self.total_size => need,
            _ => {
                debug!(
                    "buddy allocator: request of {} bytes for {} exceeds arena of {}",
                    requested, owner, self.total_size
                );
                return Err(AllocError::InsufficientTotalMemory);
            }
        };

        let Some(id) = self.find_leaf(self.root, need) else {
            debug!(
                "buddy allocator: no suitable block for {} ({} bytes, block {})",
                owner, requested, need
            );
            #[cfg(feature = "tracking")]
            {
                self.stats.failed_allocations += 1;
                MemoryStatsReporter::print_alloc_failure_stats(
                    &self.stats,
                    self.min_block_size,
                    owner,
                    requested,
                    need,
                );
            }
            return Err(AllocError::NoSuitableBlock);
        };

        let node = &mut self.nodes[id];
        node.occupy(owner, requested);
        let handle = node.handle();
        trace!(
            "buddy allocator: {} -> [{:#x}, {:#x}) ({} of {} bytes)",
            owner,
            handle.address,
            handle.end(),
            requested,
            handle.size
        );

        #[cfg(feature = "tracking")]
        self.stats.record_occupy(&handle);

        Ok(handle)
    }

    /// Release the block held by `owner` and coalesce free buddies upward.
    ///
    /// Returns the released block as it was before being cleared.
    pub fn free(&mut self, owner: &str) -> AllocResult<BlockHandle> {
        let Some(id) = self.find_owner(owner) else {
            debug!("buddy allocator: free of unknown owner {}", owner);
            return Err(AllocError::OwnerNotFound);
        };

        let node = &mut self.nodes[id];
        let handle = node.handle();
        node.release();
        trace!(
            "buddy allocator: released {} at [{:#x}, {:#x})",
            owner,
            handle.address,
            handle.end()
        );

        #[cfg(feature = "tracking")]
        self.stats.record_release(&handle);

        self.coalesce(id);

        Ok(handle)
    }

    /// Drop every block and return to a single free root leaf
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.root = self
            .nodes
            .insert(BlockNode::new(self.total_size, 0, None));
        #[cfg(feature = "tracking")]
        {
            self.stats = BuddyStats::for_arena(self.total_size);
        }
    }

    /// Left-first search for a free leaf of at least `need` bytes.
    ///
    /// A leaf is only split when its left half can hold the request, so a
    /// split never leaves behind two free buddies.
    fn find_leaf(&mut self, id: NodeId, need: usize) -> Option<NodeId> {
        let node = &self.nodes[id];
        if node.occupied {
            return None;
        }

        if let Some([left, right]) = node.children {
            return self
                .find_leaf(left, need)
                .or_else(|| self.find_leaf(right, need));
        }

        let size = node.size;
        if size < need {
            return None;
        }
        if size == need {
            return Some(id);
        }

        let half = size / 2;
        if half >= need.max(self.min_block_size) {
            let [left, right] = self.split(id);
            self.find_leaf(left, need)
                .or_else(|| self.find_leaf(right, need))
        } else {
            // Splitting would go below the floor: take the whole leaf.
            Some(id)
        }
    }

    /// Split a free leaf into two free halves
    fn split(&mut self, id: NodeId) -> [NodeId; 2] {
        let (size, address) = {
            let node = &self.nodes[id];
            debug_assert!(node.is_free_leaf());
            (node.size, node.address)
        };
        let half = size / 2;
        debug_assert!(half >= self.min_block_size);
        debug_assert!(crate::is_aligned(address, size));

        let left = self.nodes.insert(BlockNode::new(half, address, Some(id)));
        let right = self
            .nodes
            .insert(BlockNode::new(half, address + half, Some(id)));
        self.nodes[id].children = Some([left, right]);

        trace!(
            "buddy allocator: split [{:#x}, {:#x}) into two blocks of {}",
            address,
            address + size,
            half
        );
        #[cfg(feature = "tracking")]
        self.stats.record_split(size);

        [left, right]
    }

    /// Merge free buddies upward starting from the parent of `id`.
    ///
    /// Stops at the first parent whose children are not both free leaves.
    fn coalesce(&mut self, mut id: NodeId) {
        while let Some(parent) = self.nodes[id].parent {
            let Some([left, right]) = self.nodes[parent].children else {
                break;
            };
            if !(self.nodes[left].is_free_leaf() && self.nodes[right].is_free_leaf()) {
                break;
            }

            #[cfg(feature = "tracking")]
            self.stats.record_merge(self.nodes[left].size);
            self.nodes.remove(left);
            self.nodes.remove(right);
            let merged = &mut self.nodes[parent];
            merged.children = None;
            merged.occupied = false;
            trace!(
                "buddy allocator: merged buddies into [{:#x}, {:#x})",
                merged.address,
                merged.address + merged.size
            );

            id = parent;
        }
    }

    /// Pre-order search (self, left, right) for the leaf held by `owner`
    fn find_owner(&self, owner: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.occupied && node.owner() == Some(owner) {
                return Some(id);
            }
            if let Some([left, right]) = node.children {
                stack.push(right);
                stack.push(left);
            }
        }
        None
    }

    /// Leaf ids from the lowest to the highest address
    fn leaf_ids(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.nodes[id].children {
                Some([left, right]) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => leaves.push(id),
            }
        }
        leaves
    }

    /// Leaves in address order; together they tile `[0, total_size)`
    pub fn leaves_in_order(&self) -> Vec<BlockHandle> {
        self.leaf_ids()
            .into_iter()
            .map(|id| self.nodes[id].handle())
            .collect()
    }

    /// Leaf nodes in address order, with owner information
    pub fn leaf_nodes(&self) -> Vec<&BlockNode> {
        self.leaf_ids()
            .into_iter()
            .map(|id| &self.nodes[id])
            .collect()
    }

    fn occupied_leaves(&self) -> impl Iterator<Item = &BlockNode> {
        self.leaf_nodes().into_iter().filter(|node| node.occupied)
    }

    /// Internal fragmentation: unused bytes inside occupied blocks
    pub fn wasted_memory(&self) -> usize {
        self.occupied_leaves().map(BlockNode::wasted).sum()
    }

    /// Bytes requested by all current owners
    pub fn occupied_memory(&self) -> usize {
        self.occupied_leaves().map(|node| node.requested_size).sum()
    }

    /// `total_size - occupied_memory()`; waste is counted as available
    pub fn available_memory(&self) -> usize {
        self.total_size - self.occupied_memory()
    }

    /// Total size of all free leaves
    pub fn free_memory(&self) -> usize {
        self.leaf_nodes()
            .into_iter()
            .filter(|node| !node.occupied)
            .map(|node| node.size)
            .sum()
    }

    /// Size of the largest free leaf, if any leaf is free
    pub fn largest_free_block(&self) -> Option<usize> {
        self.leaf_nodes()
            .into_iter()
            .filter(|node| !node.occupied)
            .map(|node| node.size)
            .max()
    }

    /// Sorted set of owners currently holding a block
    pub fn active_owners(&self) -> BTreeSet<&str> {
        self.occupied_leaves().filter_map(BlockNode::owner).collect()
    }

    /// The block currently held by `owner`
    pub fn block_of(&self, owner: &str) -> Option<BlockHandle> {
        self.find_owner(owner).map(|id| self.nodes[id].handle())
    }

    pub fn contains_owner(&self, owner: &str) -> bool {
        self.find_owner(owner).is_some()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_ids().len()
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::with_config(BuddyConfig::default())
    }
}

impl OwnerAllocator for BuddyAllocator {
    fn allocate(&mut self, size: usize, owner: &str) -> AllocResult<BlockHandle> {
        BuddyAllocator::allocate(self, size, owner)
    }

    fn free(&mut self, owner: &str) -> AllocResult<BlockHandle> {
        BuddyAllocator::free(self, owner)
    }

    fn total_bytes(&self) -> usize {
        self.total_size
    }

    fn occupied_bytes(&self) -> usize {
        self.occupied_memory()
    }

    fn wasted_bytes(&self) -> usize {
        self.wasted_memory()
    }
}
