//! Transaction-scoped unit of work.

use crate::graph::Journal;
use crate::types::{NodeId, TransactionId};
use resgraph_store::{EntityId, EntityKind};

/// Everything a transaction has queued for its commit.
///
/// Passed explicitly to every graph mutation; there is no ambient session.
#[derive(Debug)]
pub(crate) struct UnitOfWork {
    txid: TransactionId,
    /// Pre-images and dirty marks.
    pub(crate) journal: Journal,
    persist_roots: Vec<NodeId>,
    orphans: Vec<NodeId>,
    deletes: Vec<(EntityKind, EntityId)>,
}

impl UnitOfWork {
    pub(crate) fn new(txid: TransactionId) -> Self {
        Self {
            txid,
            journal: Journal::new(),
            persist_roots: Vec::new(),
            orphans: Vec::new(),
            deletes: Vec::new(),
        }
    }

    pub(crate) fn txid(&self) -> TransactionId {
        self.txid
    }

    pub(crate) fn add_root(&mut self, node: NodeId) {
        if !self.persist_roots.contains(&node) {
            self.persist_roots.push(node);
        }
    }

    pub(crate) fn roots(&self) -> &[NodeId] {
        &self.persist_roots
    }

    pub(crate) fn add_orphan(&mut self, node: NodeId) {
        if !self.orphans.contains(&node) {
            self.orphans.push(node);
        }
    }

    pub(crate) fn take_orphans(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.orphans)
    }

    pub(crate) fn schedule_delete(&mut self, kind: EntityKind, id: EntityId) {
        if !self.deletes.contains(&(kind, id)) {
            self.deletes.push((kind, id));
        }
    }

    pub(crate) fn deletes(&self) -> &[(EntityKind, EntityId)] {
        &self.deletes
    }

    /// Splits off the journal, leaving an empty one behind.
    pub(crate) fn take_journal(&mut self) -> Journal {
        std::mem::take(&mut self.journal)
    }
}
