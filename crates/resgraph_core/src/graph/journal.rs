//! Copy-on-write undo journal.

use crate::graph::Node;
use crate::types::NodeId;
use std::collections::{BTreeSet, HashMap};

/// Records, per node, the state it had before the open transaction first
/// touched it, plus which nodes carry changes that must be flushed.
///
/// Pre-images are captured once per node (node-granularity copy-on-write);
/// `None` means the node did not exist when the transaction began.
/// Restoring every pre-image reverts the graph to its pre-transaction state.
#[derive(Debug, Default)]
pub struct Journal {
    pre_images: HashMap<NodeId, Option<Node>>,
    dirty: BTreeSet<NodeId>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_created(&mut self, id: NodeId) {
        self.pre_images.entry(id).or_insert(None);
    }

    pub(crate) fn record_before(&mut self, id: NodeId, node: &Node) {
        self.pre_images
            .entry(id)
            .or_insert_with(|| Some(node.clone()));
    }

    pub(crate) fn mark_dirty(&mut self, id: NodeId) {
        self.dirty.insert(id);
    }

    /// Returns `true` if the node has unflushed changes.
    #[must_use]
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.dirty.contains(&id)
    }

    /// Returns dirty nodes in allocation order.
    pub fn dirty(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.dirty.iter().copied()
    }

    /// Returns the number of nodes touched by the transaction.
    #[must_use]
    pub fn touched(&self) -> usize {
        self.pre_images.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_images.is_empty() && self.dirty.is_empty()
    }

    pub(crate) fn into_pre_images(self) -> HashMap<NodeId, Option<Node>> {
        self.pre_images
    }
}
