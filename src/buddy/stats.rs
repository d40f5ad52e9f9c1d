//! Statistics and debugging for buddy allocator
//!
//! Provides operation counters, a per-size snapshot of the tree and failure
//! reporting.

use alloc::collections::BTreeMap;

use super::block_node::BlockHandle;

/// Buddy system statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_bytes: usize,
    pub occupied_bytes: usize,
    pub wasted_bytes: usize,
    pub free_bytes: usize,
    pub allocations: usize,
    pub failed_allocations: usize,
    pub frees: usize,
    pub splits: usize,
    pub coalesces: usize,
    /// Free leaf count keyed by block size
    pub free_blocks_by_size: BTreeMap<usize, usize>,
    /// Occupied leaf count keyed by block size
    pub used_blocks_by_size: BTreeMap<usize, usize>,
}

impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_bytes: 0,
            occupied_bytes: 0,
            wasted_bytes: 0,
            free_bytes: 0,
            allocations: 0,
            failed_allocations: 0,
            frees: 0,
            splits: 0,
            coalesces: 0,
            free_blocks_by_size: BTreeMap::new(),
            used_blocks_by_size: BTreeMap::new(),
        }
    }

    /// Statistics of a fresh arena: one free leaf of `total_bytes`
    pub fn for_arena(total_bytes: usize) -> Self {
        let mut stats = Self::new();
        stats.total_bytes = total_bytes;
        stats.free_bytes = total_bytes;
        stats.free_blocks_by_size.insert(total_bytes, 1);
        stats
    }

    /// A free leaf of `size` became two free halves
    pub fn record_split(&mut self, size: usize) {
        take(&mut self.free_blocks_by_size, size, 1);
        *self.free_blocks_by_size.entry(size / 2).or_insert(0) += 2;
        self.splits += 1;
    }

    /// Two free buddies of `half` bytes merged into their parent
    pub fn record_merge(&mut self, half: usize) {
        take(&mut self.free_blocks_by_size, half, 2);
        *self.free_blocks_by_size.entry(half * 2).or_insert(0) += 1;
        self.coalesces += 1;
    }

    /// A free leaf was handed out as `block`
    pub fn record_occupy(&mut self, block: &BlockHandle) {
        take(&mut self.free_blocks_by_size, block.size, 1);
        *self.used_blocks_by_size.entry(block.size).or_insert(0) += 1;
        self.free_bytes -= block.size;
        self.occupied_bytes += block.occupied_bytes;
        self.wasted_bytes += block.wasted();
        self.allocations += 1;
    }

    /// The occupied `block` went back to the free leaves
    pub fn record_release(&mut self, block: &BlockHandle) {
        take(&mut self.used_blocks_by_size, block.size, 1);
        *self.free_blocks_by_size.entry(block.size).or_insert(0) += 1;
        self.free_bytes += block.size;
        self.occupied_bytes -= block.occupied_bytes;
        self.wasted_bytes -= block.wasted();
        self.frees += 1;
    }

    /// Recompute the byte totals and per-size counts from the current leaves
    pub fn record_leaves<'a>(&mut self, leaves: impl IntoIterator<Item = &'a BlockHandle>) {
        self.occupied_bytes = 0;
        self.wasted_bytes = 0;
        self.free_bytes = 0;
        self.free_blocks_by_size.clear();
        self.used_blocks_by_size.clear();

        for leaf in leaves {
            if leaf.occupied {
                self.occupied_bytes += leaf.occupied_bytes;
                self.wasted_bytes += leaf.wasted();
                *self.used_blocks_by_size.entry(leaf.size).or_insert(0) += 1;
            } else {
                self.free_bytes += leaf.size;
                *self.free_blocks_by_size.entry(leaf.size).or_insert(0) += 1;
            }
        }
    }

    /// Share of the occupied block space lost to internal fragmentation, in percent
    pub fn waste_percent(&self) -> usize {
        let used_space = self.occupied_bytes + self.wasted_bytes;
        if used_space == 0 {
            0
        } else {
            self.wasted_bytes * 100 / used_space
        }
    }
}

/// Remove `n` blocks of `size` from a per-size count, dropping empty entries
fn take(counts: &mut BTreeMap<usize, usize>, size: usize, n: usize) {
    if let Some(count) = counts.get_mut(&size) {
        *count = count.saturating_sub(n);
        if *count == 0 {
            counts.remove(&size);
        }
    }
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Print detailed allocation failure statistics
    /// This is a standalone function to keep allocation logic clean
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(
        stats: &BuddyStats,
        min_block_size: usize,
        owner: &str,
        request_bytes: usize,
        normalized: usize,
    ) {
        {
            #[cfg(feature = "log")]
            use log::error;
            error!("========================================");
            error!(
                "Request: owner {} wants {} bytes (block of {})",
                owner, request_bytes, normalized
            );

            error!("Overall Memory State:");
            error!("  Total bytes: {}", stats.total_bytes);
            error!("  Min block: {}", min_block_size);
            error!("  Occupied bytes: {}", stats.occupied_bytes);
            error!("  Wasted bytes: {}", stats.wasted_bytes);
            error!("  Free bytes: {}", stats.free_bytes);
            error!("========================================");

            error!("Free blocks by size:");
            for (size, count) in stats.free_blocks_by_size.iter().rev() {
                error!(
                    "    Size {}: {} blocks ({} bytes total)",
                    size,
                    count,
                    size * count
                );
            }
            error!("Used blocks by size:");
            for (size, count) in stats.used_blocks_by_size.iter().rev() {
                error!("    Size {}: {} blocks", size, count);
            }

            error!("========================================");
        }
    }
}
