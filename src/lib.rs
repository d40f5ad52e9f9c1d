//! Buddy Tree Allocator
//!
//! This crate models a buddy-system memory allocator over an abstract arena,
//! featuring:
//! - Tree-based buddy allocator with owner tracking and coalescing on free
//! - Internal fragmentation and occupancy metrics
//! - Spin-locked wrapper for shared use
//! - Memory map segments and unit helpers for display layers
//! - Seeded batch workload simulator

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

use thiserror::Error;

/// The error type used for allocation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The owner identifier is empty.
    #[error("owner identifier must not be empty")]
    InvalidOwnerId,
    /// A zero-byte request.
    #[error("requested size must be greater than zero")]
    InvalidSize,
    /// The owner already holds a block.
    #[error("owner already holds a block")]
    DuplicateOwner,
    /// The normalized request is larger than the whole arena.
    #[error("request exceeds total arena capacity")]
    InsufficientTotalMemory,
    /// No single free block can hold the request.
    #[error("no suitable free block")]
    NoSuitableBlock,
    /// No occupied block belongs to the owner.
    #[error("owner not found")]
    OwnerNotFound,
    /// The allocator has not been initialized yet.
    #[error("allocator not initialized")]
    Uninitialized,
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Owner-keyed allocator interface shared by the plain and the locked allocator.
pub trait OwnerAllocator {
    /// Allocate a block holding `size` bytes for `owner`.
    fn allocate(&mut self, size: usize, owner: &str) -> AllocResult<BlockHandle>;

    /// Release the block held by `owner`.
    fn free(&mut self, owner: &str) -> AllocResult<BlockHandle>;

    /// Returns the arena capacity in bytes.
    fn total_bytes(&self) -> usize;

    /// Returns the requested bytes of all occupied blocks.
    fn occupied_bytes(&self) -> usize;

    /// Returns the internal fragmentation of all occupied blocks.
    fn wasted_bytes(&self) -> usize;

    /// Returns `total_bytes() - occupied_bytes()`.
    fn available_bytes(&self) -> usize {
        self.total_bytes() - self.occupied_bytes()
    }
}

/// Round `n` up to the next power of two.
///
/// Zero is treated as one. Returns `None` when the result does not fit in a
/// `usize`.
#[inline]
pub const fn normalize_size(n: usize) -> Option<usize> {
    if n == 0 {
        return Some(1);
    }
    n.checked_next_power_of_two()
}

/// Address of the buddy of the block at `address` with `size` bytes.
#[inline]
pub const fn buddy_address(address: usize, size: usize) -> usize {
    address ^ size
}

/// Base address shared by a block and its buddy.
#[inline]
pub const fn buddy_base(address: usize, size: usize) -> usize {
    let buddy = buddy_address(address, size);
    if buddy < address {
        buddy
    } else {
        address
    }
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
const fn is_aligned(base_addr: usize, align: usize) -> bool {
    base_addr & (align - 1) == 0
}

pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::BuddyStats;
pub use buddy::{BlockHandle, BlockNode, BuddyAllocator, BuddyConfig, NodeId};

pub mod locked_allocator;
pub use locked_allocator::LockedBuddyAllocator;

pub mod layout;
pub use layout::{memory_map, Segment};

pub mod units;
pub use units::{format_size, to_bytes, SizeUnit};

pub mod simulator;
pub use simulator::{
    generate_workload, ProcessRequest, ProcessStatus, SimEvent, Simulator, SimulatorConfig,
    StatusSummary, WorkloadConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_size_small_values() {
        assert_eq!(normalize_size(0), Some(1));
        assert_eq!(normalize_size(1), Some(1));
        assert_eq!(normalize_size(2), Some(2));
        assert_eq!(normalize_size(3), Some(4));
        assert_eq!(normalize_size(200), Some(256));
        assert_eq!(normalize_size(1024), Some(1024));
        assert_eq!(normalize_size(1025), Some(2048));
    }

    #[test]
    fn test_normalize_size_overflow() {
        let top = 1usize << (usize::BITS - 1);
        assert_eq!(normalize_size(top), Some(top));
        assert_eq!(normalize_size(top + 1), None);
    }

    #[test]
    fn test_buddy_address_and_base() {
        assert_eq!(buddy_address(0, 256), 256);
        assert_eq!(buddy_address(256, 256), 0);
        assert_eq!(buddy_address(512, 128), 640);
        assert_eq!(buddy_base(640, 128), 512);
        assert_eq!(buddy_base(512, 128), 512);
    }

    #[test]
    fn test_error_display() {
        use alloc::string::ToString;
        assert_eq!(AllocError::OwnerNotFound.to_string(), "owner not found");
    }
}
