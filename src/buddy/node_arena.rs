//! Node arena for the buddy tree
//!
//! Provides a single pool of tree nodes owned by the allocator. Parent and
//! child links are indices into this pool, so the tree has no reference
//! cycles and released slots are reused by later splits.

use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use super::block_node::{BlockNode, NodeId};

/// A slot is either a live node or a link in the vacant-slot free list
#[derive(Debug, Clone)]
enum Slot {
    Live(BlockNode),
    Vacant { next: Option<usize> },
}

/// Node arena - every node of the buddy tree lives here
///
/// Vacant slots form a singly linked free list threaded through the slot
/// vector itself.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    /// Free list head - first vacant slot
    free_head: Option<usize>,
    /// Current number of vacant slots
    vacant_slots: usize,
    /// Allocation statistics
    total_allocations: usize,
    total_deallocations: usize,
}

impl NodeArena {
    /// Create an empty arena
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            vacant_slots: 0,
            total_allocations: 0,
            total_deallocations: 0,
        }
    }

    /// Store a node, reusing a vacant slot when one is available
    pub fn insert(&mut self, node: BlockNode) -> NodeId {
        self.total_allocations += 1;

        if let Some(idx) = self.free_head {
            if let Slot::Vacant { next } = self.slots[idx] {
                self.free_head = next;
            }
            self.slots[idx] = Slot::Live(node);
            self.vacant_slots -= 1;
            return NodeId(idx);
        }

        self.slots.push(Slot::Live(node));
        NodeId(self.slots.len() - 1)
    }

    /// Remove a node and return its slot to the free list
    ///
    /// The node must not be referenced by any other live node when removed.
    pub fn remove(&mut self, id: NodeId) -> Option<BlockNode> {
        let slot = self.slots.get_mut(id.0)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }

        let old = core::mem::replace(
            slot,
            Slot::Vacant {
                next: self.free_head,
            },
        );
        self.free_head = Some(id.0);
        self.vacant_slots += 1;
        self.total_deallocations += 1;

        match old {
            Slot::Live(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    /// Get a reference to a node by id
    pub fn get(&self, id: NodeId) -> Option<&BlockNode> {
        match self.slots.get(id.0)? {
            Slot::Live(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    /// Get a mutable reference to a node by id
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut BlockNode> {
        match self.slots.get_mut(id.0)? {
            Slot::Live(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    /// Drop every node and forget all statistics
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Number of live nodes
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.vacant_slots
    }

    /// Number of vacant slots waiting for reuse
    pub fn vacant_count(&self) -> usize {
        self.vacant_slots
    }

    /// Get arena statistics
    pub fn get_stats(&self) -> ArenaStats {
        ArenaStats {
            total_slots: self.slots.len(),
            live_nodes: self.live_count(),
            vacant_slots: self.vacant_slots,
            total_allocations: self.total_allocations,
            total_deallocations: self.total_deallocations,
        }
    }
}

impl Index<NodeId> for NodeArena {
    type Output = BlockNode;

    /// Panics if `id` refers to a vacant slot; ids handed out by the tree
    /// always point at live nodes.
    fn index(&self, id: NodeId) -> &BlockNode {
        match &self.slots[id.0] {
            Slot::Live(node) => node,
            Slot::Vacant { .. } => panic!("node {} is vacant", id.0),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut BlockNode {
        match &mut self.slots[id.0] {
            Slot::Live(node) => node,
            Slot::Vacant { .. } => panic!("node {} is vacant", id.0),
        }
    }
}

/// Arena statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub total_slots: usize,
    pub live_nodes: usize,
    pub vacant_slots: usize,
    pub total_allocations: usize,
    pub total_deallocations: usize,
}
