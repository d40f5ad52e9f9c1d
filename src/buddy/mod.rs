//! Buddy tree allocator module
//!
//! This module provides the tree-based buddy system with:
//! - Index-based node arena with slot reuse
//! - Left-first allocation with a minimum block size floor
//! - Owner lookup, coalescing on free and fragmentation metrics
//! - Detailed statistics and failure reporting

pub mod block_node;
pub mod buddy_allocator;
pub mod node_arena;
#[cfg(feature = "tracking")]
pub mod stats;

#[cfg(test)]
mod tests_prop;

pub use block_node::{BlockHandle, BlockNode, NodeId};
pub use buddy_allocator::{BuddyAllocator, BuddyConfig, DEFAULT_MIN_BLOCK_SIZE, DEFAULT_TOTAL_SIZE};
pub use node_arena::{ArenaStats, NodeArena};
#[cfg(feature = "tracking")]
pub use stats::{BuddyStats, MemoryStatsReporter};
