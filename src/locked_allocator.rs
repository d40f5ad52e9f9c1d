//! Spin-locked buddy allocator.
//!
//! This module wraps [`BuddyAllocator`] in a single `SpinNoIrq` lock so it can
//! be shared between threads or placed in a `static`. Every operation,
//! including metric queries, takes the lock for its whole duration, so no
//! caller ever observes a half-finished split or coalesce.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use kspin::SpinNoIrq;

use crate::buddy::{BlockHandle, BuddyAllocator, BuddyConfig};
use crate::{AllocError, AllocResult, OwnerAllocator};

#[cfg(feature = "tracking")]
use crate::buddy::BuddyStats;

#[cfg(feature = "log")]
use log::{error, info};

/// Buddy allocator behind one exclusive lock
pub struct LockedBuddyAllocator {
    inner: SpinNoIrq<Option<BuddyAllocator>>,
    initialized: AtomicBool,
}

impl LockedBuddyAllocator {
    pub const fn new() -> Self {
        Self {
            inner: SpinNoIrq::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Initialize (or re-initialize) the arena
    pub fn init(&self, total_size: usize, min_block_size: usize) {
        let allocator = BuddyAllocator::new(total_size, min_block_size);
        info!(
            "locked allocator: arena of {} bytes, min block {}",
            allocator.total_size(),
            allocator.min_block_size()
        );
        *self.inner.lock() = Some(allocator);
        self.initialized.store(true, Ordering::SeqCst);
    }

    /// Initialize from a [`BuddyConfig`]
    pub fn init_with_config(&self, config: BuddyConfig) {
        self.init(config.total_size, config.min_block_size);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Run `f` against the allocator while holding the lock
    ///
    /// The lock is not reentrant: `f` must use the `&mut BuddyAllocator` it is
    /// given and must not call back into this `LockedBuddyAllocator`, or it
    /// spins forever.
    pub fn with<R>(&self, f: impl FnOnce(&mut BuddyAllocator) -> R) -> AllocResult<R> {
        if !self.is_initialized() {
            return Err(AllocError::Uninitialized);
        }
        let mut guard = self.inner.lock();
        match guard.as_mut() {
            Some(allocator) => Ok(f(allocator)),
            None => Err(AllocError::Uninitialized),
        }
    }

    pub fn allocate(&self, size: usize, owner: &str) -> AllocResult<BlockHandle> {
        if !self.is_initialized() {
            error!("locked allocator: allocate before init");
        }
        self.with(|allocator| allocator.allocate(size, owner))?
    }

    pub fn free(&self, owner: &str) -> AllocResult<BlockHandle> {
        self.with(|allocator| allocator.free(owner))?
    }

    pub fn reset(&self) -> AllocResult {
        self.with(BuddyAllocator::reset)
    }

    pub fn total_size(&self) -> usize {
        self.with(|allocator| allocator.total_size()).unwrap_or(0)
    }

    pub fn wasted_memory(&self) -> usize {
        self.with(|allocator| allocator.wasted_memory()).unwrap_or(0)
    }

    pub fn occupied_memory(&self) -> usize {
        self.with(|allocator| allocator.occupied_memory()).unwrap_or(0)
    }

    pub fn available_memory(&self) -> usize {
        self.with(|allocator| allocator.available_memory()).unwrap_or(0)
    }

    /// Owners currently holding a block, sorted
    pub fn active_owners(&self) -> BTreeSet<String> {
        self.with(|allocator| {
            allocator
                .active_owners()
                .into_iter()
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn leaves_in_order(&self) -> Vec<BlockHandle> {
        self.with(|allocator| allocator.leaves_in_order())
            .unwrap_or_default()
    }

    /// Get buddy allocator statistics
    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> AllocResult<BuddyStats> {
        self.with(|allocator| allocator.get_stats().clone())
    }
}

impl Default for LockedBuddyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerAllocator for LockedBuddyAllocator {
    fn allocate(&mut self, size: usize, owner: &str) -> AllocResult<BlockHandle> {
        LockedBuddyAllocator::allocate(self, size, owner)
    }

    fn free(&mut self, owner: &str) -> AllocResult<BlockHandle> {
        LockedBuddyAllocator::free(self, owner)
    }

    fn total_bytes(&self) -> usize {
        self.total_size()
    }

    fn occupied_bytes(&self) -> usize {
        self.occupied_memory()
    }

    fn wasted_bytes(&self) -> usize {
        self.wasted_memory()
    }
}

impl OwnerAllocator for &LockedBuddyAllocator {
    fn allocate(&mut self, size: usize, owner: &str) -> AllocResult<BlockHandle> {
        LockedBuddyAllocator::allocate(self, size, owner)
    }

    fn free(&mut self, owner: &str) -> AllocResult<BlockHandle> {
        LockedBuddyAllocator::free(self, owner)
    }

    fn total_bytes(&self) -> usize {
        self.total_size()
    }

    fn occupied_bytes(&self) -> usize {
        self.occupied_memory()
    }

    fn wasted_bytes(&self) -> usize {
        self.wasted_memory()
    }
}
