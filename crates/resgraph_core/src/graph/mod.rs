//! The in-memory entity graph.
//!
//! An arena of nodes keyed by [`NodeId`]. Associations are node ids resolved
//! through the arena, so bidirectional and cyclic links (user, reservation,
//! room, equipment) never form ownership cycles. Every mutation goes through
//! a [`Journal`] so the open transaction can be reverted.

mod journal;
mod node;

pub use journal::Journal;
pub use node::{Node, NodeBody};

use crate::entity::HolderSide;
use crate::error::{CoreError, CoreResult};
use crate::types::{LifecycleState, NodeId};
use resgraph_store::{EntityId, EntityKind};
use std::collections::{HashMap, HashSet};

/// Holds every transient, managed and not-yet-evicted removed entity.
#[derive(Debug, Default)]
pub struct EntityGraph {
    nodes: HashMap<NodeId, Node>,
    /// Identity map: at most one node per persisted entity.
    index: HashMap<(EntityKind, EntityId), NodeId>,
    next_node: u64,
}

impl EntityGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if the node is in the graph.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns a node.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the node was evicted or discarded.
    pub fn node(&self, id: NodeId) -> CoreResult<&Node> {
        self.nodes.get(&id).ok_or(CoreError::UnknownNode { node: id })
    }

    /// Iterates over all nodes in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Finds the live node holding a persisted entity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no node holds `(kind, id)` or if it was removed.
    pub fn lookup(&self, kind: EntityKind, id: EntityId) -> CoreResult<NodeId> {
        match self.resolve(kind, id) {
            Some(node) if self.nodes[&node].state() != LifecycleState::Removed => Ok(node),
            _ => Err(CoreError::NotFound { kind, id }),
        }
    }

    /// Finds the node holding `(kind, id)`, including removed ones.
    pub(crate) fn resolve(&self, kind: EntityKind, id: EntityId) -> Option<NodeId> {
        self.index.get(&(kind, id)).copied()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId, journal: &mut Journal) -> CoreResult<&mut Node> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(CoreError::UnknownNode { node: id })?;
        journal.record_before(id, node);
        Ok(node)
    }

    /// Registers a node. No datastore interaction.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if the node carries an identity that
    /// another node already holds.
    pub(crate) fn create(&mut self, node: Node, journal: &mut Journal) -> CoreResult<NodeId> {
        if let Some(id) = node.id() {
            if self.index.contains_key(&(node.kind(), id)) {
                return Err(CoreError::DuplicateIdentity {
                    kind: node.kind(),
                    id,
                });
            }
        }

        self.next_node += 1;
        let node_id = NodeId(self.next_node);
        if let Some(id) = node.id() {
            self.index.insert((node.kind(), id), node_id);
        }
        self.nodes.insert(node_id, node);
        journal.record_created(node_id);
        Ok(node_id)
    }

    /// Gives a node the identity the datastore assigned to it.
    pub(crate) fn assign_id(
        &mut self,
        node_id: NodeId,
        id: EntityId,
        journal: &mut Journal,
    ) -> CoreResult<()> {
        let kind = self.node(node_id)?.kind();
        match self.index.get(&(kind, id)) {
            Some(&existing) if existing != node_id => {
                return Err(CoreError::DuplicateIdentity { kind, id });
            }
            _ => {}
        }

        let node = self.node_mut(node_id, journal)?;
        if let Some(previous) = node.id() {
            if previous != id {
                return Err(CoreError::invalid_state(format!(
                    "{node_id} already has identity {previous}"
                )));
            }
        }
        node.set_id(id);
        self.index.insert((kind, id), node_id);
        Ok(())
    }

    /// Removes a node from the graph without touching the datastore.
    ///
    /// Partners lose their edges to the node in memory only; they are not
    /// marked dirty. A user takes its reservations with it, since a
    /// reservation cannot stay in the graph without its owner.
    ///
    /// Returns the evicted nodes, first the requested one, with edges
    /// stripped and state [`LifecycleState::Detached`].
    pub(crate) fn evict(&mut self, id: NodeId, journal: &mut Journal) -> CoreResult<Vec<Node>> {
        let mut evicted = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Ok(node) = self.node(current) else {
                continue;
            };
            if node.kind() == EntityKind::User {
                pending.extend(node.reservations().iter().rev().copied());
            }
            evicted.push(self.unlink_and_take(current, journal)?);
        }
        Ok(evicted)
    }

    fn unlink_and_take(&mut self, id: NodeId, journal: &mut Journal) -> CoreResult<Node> {
        let node = self.node(id)?.clone();

        match node.body() {
            NodeBody::User { reservations, .. } => {
                for &r in reservations {
                    if let Ok(partner) = self.node_mut(r, journal) {
                        partner.set_back_ref(HolderSide::Owner, None);
                    }
                }
            }
            NodeBody::Room {
                reservations,
                equipment,
                ..
            } => {
                for &r in reservations {
                    if let Ok(partner) = self.node_mut(r, journal) {
                        partner.set_back_ref(HolderSide::Room, None);
                    }
                }
                for &e in equipment {
                    if let Some(rooms) = self.node_mut(e, journal).ok().and_then(Node::members_mut) {
                        rooms.remove(&id);
                    }
                }
            }
            NodeBody::Reservation { owner, room, .. } => {
                for holder in owner.iter().chain(room) {
                    if let Some(seq) = self
                        .node_mut(*holder, journal)
                        .ok()
                        .and_then(Node::reservations_mut)
                    {
                        seq.retain(|&r| r != id);
                    }
                }
            }
            NodeBody::Equipment { rooms, .. } => {
                for &room in rooms {
                    if let Some(set) = self.node_mut(room, journal).ok().and_then(Node::members_mut) {
                        set.remove(&id);
                    }
                }
            }
        }

        journal.record_before(id, &node);
        self.nodes.remove(&id);
        if let Some(entity_id) = node.id() {
            self.index.remove(&(node.kind(), entity_id));
        }

        let mut detached = node;
        detached.strip_edges();
        detached.set_state(LifecycleState::Detached);
        Ok(detached)
    }

    /// Evicts every node.
    pub(crate) fn clear(&mut self, journal: &mut Journal) {
        for (id, node) in &self.nodes {
            journal.record_before(*id, node);
        }
        self.nodes.clear();
        self.index.clear();
    }

    /// Drops removed nodes whose row delete is not in `pending`.
    ///
    /// Removed nodes carry no edges, so no partner changes. Their handles
    /// become stale. Returns the number of nodes dropped.
    pub(crate) fn purge_removed(
        &mut self,
        pending: &[(EntityKind, EntityId)],
        journal: &mut Journal,
    ) -> usize {
        let purged: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.state() == LifecycleState::Removed
                    && !node.id().is_some_and(|id| pending.contains(&(node.kind(), id)))
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &purged {
            if let Some(node) = self.nodes.remove(id) {
                journal.record_before(*id, &node);
                if let Some(entity_id) = node.id() {
                    self.index.remove(&(node.kind(), entity_id));
                }
            }
        }
        purged.len()
    }

    /// Reverts every node recorded in the journal to its pre-image.
    pub(crate) fn restore(&mut self, journal: Journal) {
        for (id, pre_image) in journal.into_pre_images() {
            match pre_image {
                Some(node) => {
                    self.nodes.insert(id, node);
                }
                None => {
                    self.nodes.remove(&id);
                }
            }
        }
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .filter_map(|(node_id, node)| node.id().map(|id| ((node.kind(), id), *node_id)))
            .collect();
    }

    /// Checks relationship invariants over every live node.
    ///
    /// - Every managed reservation has an owner
    /// - A reservation's owner and room list it, and every listed
    ///   reservation points back at its holder
    /// - Reservation sequences contain no duplicates
    /// - Room/equipment membership is symmetric
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` describing the first violation found.
    pub fn verify(&self) -> CoreResult<()> {
        let mut ids: Vec<_> = self.nodes.keys().copied().collect();
        ids.sort();

        for id in ids {
            let node = &self.nodes[&id];
            if node.state() == LifecycleState::Removed {
                continue;
            }
            match node.body() {
                NodeBody::User { reservations, .. } => {
                    self.verify_sequence(id, reservations, HolderSide::Owner)?;
                }
                NodeBody::Room {
                    reservations,
                    equipment,
                    ..
                } => {
                    self.verify_sequence(id, reservations, HolderSide::Room)?;
                    for &e in equipment {
                        self.verify_member(id, e)?;
                    }
                }
                NodeBody::Reservation { owner, room, .. } => {
                    match owner {
                        Some(user) => self.verify_listed(id, *user)?,
                        None if node.state() == LifecycleState::Managed => {
                            return Err(CoreError::invalid_state(format!(
                                "managed reservation {id} has no owner"
                            )));
                        }
                        None => {}
                    }
                    if let Some(room) = room {
                        self.verify_listed(id, *room)?;
                    }
                }
                NodeBody::Equipment { rooms, .. } => {
                    for &room in rooms {
                        self.verify_member(id, room)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn verify_sequence(&self, holder: NodeId, seq: &[NodeId], side: HolderSide) -> CoreResult<()> {
        let mut seen = HashSet::new();
        for &r in seq {
            if !seen.insert(r) {
                return Err(CoreError::invalid_state(format!(
                    "{r} appears twice in the reservations of {holder}"
                )));
            }
            let back = self.node(r)?.back_ref(side);
            if back != Some(holder) {
                return Err(CoreError::invalid_state(format!(
                    "{holder} lists {r} but its {} reference is {back:?}",
                    side.kind()
                )));
            }
        }
        Ok(())
    }

    fn verify_listed(&self, reservation: NodeId, holder: NodeId) -> CoreResult<()> {
        if self.node(holder)?.reservations().contains(&reservation) {
            Ok(())
        } else {
            Err(CoreError::invalid_state(format!(
                "{reservation} points at {holder} which does not list it"
            )))
        }
    }

    fn verify_member(&self, node: NodeId, partner: NodeId) -> CoreResult<()> {
        let symmetric = self
            .node(partner)?
            .members()
            .is_some_and(|members| members.contains(&node));
        if symmetric {
            Ok(())
        } else {
            Err(CoreError::invalid_state(format!(
                "{node} contains {partner} but not the other way round"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Equipment, Room, User};

    fn user_node() -> Node {
        Node::transient(User::new("Alshammari", "Ahmad", "ahmad@example.com").into_body())
    }

    #[test]
    fn create_registers_transient_node() {
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        let id = graph.create(user_node(), &mut journal).unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(id).unwrap().state(), LifecycleState::Transient);
    }

    #[test]
    fn create_rejects_duplicate_identity() {
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        let id = EntityId::new();
        let body = User::new("A", "B", "a@b").into_body();

        graph.create(Node::managed(id, body.clone()), &mut journal).unwrap();
        let result = graph.create(Node::managed(id, body), &mut journal);
        assert!(matches!(result, Err(CoreError::DuplicateIdentity { .. })));
    }

    #[test]
    fn lookup_misses_are_not_found() {
        let graph = EntityGraph::new();
        let result = graph.lookup(EntityKind::Room, EntityId::new());
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn lookup_hides_removed_nodes() {
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        let id = EntityId::new();
        let node = graph
            .create(Node::managed(id, user_node().body().clone()), &mut journal)
            .unwrap();
        assert_eq!(graph.lookup(EntityKind::User, id).unwrap(), node);

        graph
            .node_mut(node, &mut journal)
            .unwrap()
            .set_state(LifecycleState::Removed);
        assert!(graph.lookup(EntityKind::User, id).is_err());
        assert_eq!(graph.resolve(EntityKind::User, id), Some(node));
    }

    #[test]
    fn restore_reverts_creations_and_edits() {
        let mut graph = EntityGraph::new();
        let mut setup = Journal::new();
        let kept = graph.create(user_node(), &mut setup).unwrap();

        let mut journal = Journal::new();
        let added = graph.create(user_node(), &mut journal).unwrap();
        graph
            .assign_id(kept, EntityId::new(), &mut journal)
            .unwrap();

        graph.restore(journal);

        assert!(!graph.contains(added));
        assert_eq!(graph.node(kept).unwrap().id(), None);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn evict_unlinks_partners_locally() {
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        let room = graph
            .create(Node::transient(Room::new("Room Hassan", 25).into_body()), &mut journal)
            .unwrap();
        let projector = graph
            .create(
                Node::transient(Equipment::new("Projector", "HD projector").into_body()),
                &mut journal,
            )
            .unwrap();
        graph
            .node_mut(room, &mut journal)
            .unwrap()
            .members_mut()
            .unwrap()
            .insert(projector);
        graph
            .node_mut(projector, &mut journal)
            .unwrap()
            .members_mut()
            .unwrap()
            .insert(room);

        let evicted = graph.evict(projector, &mut journal).unwrap();

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].state(), LifecycleState::Detached);
        assert!(graph.node(room).unwrap().members().unwrap().is_empty());
        assert!(!journal.is_dirty(room));
        graph.verify().unwrap();
    }

    #[test]
    fn purge_keeps_pending_deletes() {
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        let (done, pending) = (EntityId::new(), EntityId::new());
        let mut nodes = Vec::new();
        for id in [done, pending] {
            let node = graph
                .create(Node::managed(id, user_node().body().clone()), &mut journal)
                .unwrap();
            graph
                .node_mut(node, &mut journal)
                .unwrap()
                .set_state(LifecycleState::Removed);
            nodes.push(node);
        }

        let mut purge = Journal::new();
        let dropped = graph.purge_removed(&[(EntityKind::User, pending)], &mut purge);

        assert_eq!(dropped, 1);
        assert!(!graph.contains(nodes[0]));
        assert_eq!(graph.resolve(EntityKind::User, done), None);
        assert_eq!(graph.resolve(EntityKind::User, pending), Some(nodes[1]));

        graph.restore(purge);
        assert_eq!(graph.resolve(EntityKind::User, done), Some(nodes[0]));
    }

    #[test]
    fn verify_reports_asymmetric_membership() {
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        let room = graph
            .create(Node::transient(Room::new("Room Mariam", 40).into_body()), &mut journal)
            .unwrap();
        let screen = graph
            .create(
                Node::transient(Equipment::new("Interactive Screen", "65-inch").into_body()),
                &mut journal,
            )
            .unwrap();
        graph
            .node_mut(room, &mut journal)
            .unwrap()
            .members_mut()
            .unwrap()
            .insert(screen);

        assert!(matches!(graph.verify(), Err(CoreError::InvalidState { .. })));
    }
}
