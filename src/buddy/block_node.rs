//! Buddy tree node metadata
//!
//! Represents a block of the arena in the buddy tree with size, address and
//! occupancy information.

use alloc::string::String;

/// Index of a node inside the allocator's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw slot index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Buddy tree node
///
/// A node is either a leaf (free or occupied by one owner) or an interior
/// node that has been split into two halves. Nodes are owned by the arena;
/// `parent` and `children` are plain indices into it.
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub(crate) size: usize,
    pub(crate) address: usize,
    pub(crate) occupied: bool,
    pub(crate) owner: Option<String>,
    pub(crate) requested_size: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Option<[NodeId; 2]>,
}

impl BlockNode {
    /// Create a free leaf
    pub const fn new(size: usize, address: usize, parent: Option<NodeId>) -> Self {
        Self {
            size,
            address,
            occupied: false,
            owner: None,
            requested_size: 0,
            parent,
            children: None,
        }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn address(&self) -> usize {
        self.address
    }

    pub const fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Owner currently holding this block, if any
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Bytes requested by the owner (before rounding)
    pub const fn requested_size(&self) -> usize {
        self.requested_size
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub const fn children(&self) -> Option<[NodeId; 2]> {
        self.children
    }

    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub const fn is_interior(&self) -> bool {
        self.children.is_some()
    }

    /// A leaf that nobody occupies
    pub const fn is_free_leaf(&self) -> bool {
        self.is_leaf() && !self.occupied
    }

    /// Internal fragmentation of this block (zero when free)
    pub const fn wasted(&self) -> usize {
        if self.occupied {
            self.size - self.requested_size
        } else {
            0
        }
    }

    /// Calculate the buddy address for this block
    /// The buddy is the other half of the parent block: A ^ size
    pub const fn buddy_addr(&self) -> usize {
        crate::buddy_address(self.address, self.size)
    }

    /// Snapshot of the externally visible block data
    pub const fn handle(&self) -> BlockHandle {
        BlockHandle {
            address: self.address,
            size: self.size,
            occupied_bytes: self.requested_size,
            occupied: self.occupied,
        }
    }

    pub(crate) fn occupy(&mut self, owner: &str, requested_size: usize) {
        debug_assert!(self.is_free_leaf());
        debug_assert!(requested_size <= self.size);
        self.occupied = true;
        self.owner = Some(String::from(owner));
        self.requested_size = requested_size;
    }

    pub(crate) fn release(&mut self) {
        self.occupied = false;
        self.owner = None;
        self.requested_size = 0;
    }
}

/// Value snapshot of a block handed out to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub address: usize,
    pub size: usize,
    /// Bytes actually requested by the owner
    pub occupied_bytes: usize,
    pub occupied: bool,
}

impl BlockHandle {
    /// Internal fragmentation inside the block
    pub const fn wasted(&self) -> usize {
        if self.occupied {
            self.size - self.occupied_bytes
        } else {
            0
        }
    }

    /// One past the last byte of the block
    pub const fn end(&self) -> usize {
        self.address + self.size
    }

    pub const fn buddy_addr(&self) -> usize {
        crate::buddy_address(self.address, self.size)
    }
}
