//! Flush execution with compensation.

use crate::cascade::FlushPlan;
use crate::error::{CoreError, CoreResult};
use crate::graph::{EntityGraph, Journal, NodeBody};
use crate::transaction::CommitSummary;
use crate::types::{LifecycleState, NodeId, TransactionId};
use resgraph_store::{
    Datastore, EntityId, EntityKind, Record, ReservationRecord, StoreResult,
};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// The inverse of one applied store call.
#[derive(Debug)]
enum Undo {
    Restore { id: EntityId, record: Record },
    Remove { kind: EntityKind, id: EntityId },
    WriteJoin { room: EntityId, equipment: EntityId },
    DeleteJoin { room: EntityId, equipment: EntityId },
}

impl Undo {
    fn apply(&self, store: &dyn Datastore) -> StoreResult<()> {
        match self {
            Undo::Restore { id, record } => store.upsert(Some(*id), record).map(|_| ()),
            Undo::Remove { kind, id } => store.delete(*kind, *id),
            Undo::WriteJoin { room, equipment } => store.write_join(*room, *equipment),
            Undo::DeleteJoin { room, equipment } => store.delete_join(*room, *equipment),
        }
    }
}

/// Applies a [`FlushPlan`] to a datastore.
///
/// Each applied call records its inverse. If any call fails, the inverses
/// are replayed newest-first and the original error is returned; the caller
/// is responsible for restoring the graph.
pub(crate) struct Executor<'a> {
    store: &'a dyn Datastore,
    undo: Vec<Undo>,
    summary: CommitSummary,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(store: &'a dyn Datastore, txid: TransactionId) -> Self {
        Self {
            store,
            undo: Vec::new(),
            summary: CommitSummary::new(txid),
        }
    }

    pub(crate) fn execute(
        mut self,
        plan: &FlushPlan,
        graph: &mut EntityGraph,
        journal: &mut Journal,
    ) -> CoreResult<CommitSummary> {
        match self.apply(plan, graph, journal) {
            Ok(()) => Ok(self.summary),
            Err(err) => {
                self.compensate();
                Err(err)
            }
        }
    }

    fn apply(
        &mut self,
        plan: &FlushPlan,
        graph: &mut EntityGraph,
        journal: &mut Journal,
    ) -> CoreResult<()> {
        for &node in &plan.upserts {
            self.upsert(graph, journal, node)?;
        }

        let mut dropped = HashSet::new();
        for &room in &plan.join_rooms {
            self.sync_joins(graph, room, &mut dropped)?;
        }

        for &(kind, id) in &plan.deletes {
            let pairs: Vec<(EntityId, EntityId)> = match kind {
                EntityKind::Room => self
                    .store
                    .equipment_of(id)?
                    .into_iter()
                    .map(|e| (id, e))
                    .collect(),
                EntityKind::Equipment => self
                    .store
                    .rooms_of(id)?
                    .into_iter()
                    .map(|r| (r, id))
                    .collect(),
                EntityKind::User | EntityKind::Reservation => Vec::new(),
            };
            for (room, equipment) in pairs {
                if dropped.insert((room, equipment)) {
                    self.delete_join(room, equipment)?;
                }
            }
        }

        for &(kind, id) in &plan.deletes {
            let prior = self.store.find(kind, id)?;
            self.store.delete(kind, id)?;
            debug!(%kind, %id, "deleted");
            if let Some(record) = prior {
                self.undo.push(Undo::Restore { id, record });
                self.summary.deleted += 1;
            }
        }
        Ok(())
    }

    fn upsert(&mut self, graph: &mut EntityGraph, journal: &mut Journal, node: NodeId) -> CoreResult<()> {
        let record = record_of(graph, node)?;
        let kind = record.kind();

        match graph.node(node)?.id() {
            Some(id) => {
                let prior = self.store.find(kind, id)?;
                self.store.upsert(Some(id), &record)?;
                match prior {
                    Some(prior) => {
                        self.undo.push(Undo::Restore { id, record: prior });
                        self.summary.updated += 1;
                    }
                    None => {
                        self.undo.push(Undo::Remove { kind, id });
                        self.summary.inserted += 1;
                    }
                }
                debug!(%kind, %id, %node, "upserted");
            }
            None => {
                let id = self.store.upsert(None, &record)?;
                self.undo.push(Undo::Remove { kind, id });
                self.summary.inserted += 1;
                graph.assign_id(node, id, journal)?;
                debug!(%kind, %id, %node, "inserted");
            }
        }

        let current = graph.node(node)?.state();
        if current != LifecycleState::Managed {
            graph
                .node_mut(node, journal)?
                .set_state(LifecycleState::Managed);
        }
        Ok(())
    }

    fn sync_joins(
        &mut self,
        graph: &EntityGraph,
        room: NodeId,
        dropped: &mut HashSet<(EntityId, EntityId)>,
    ) -> CoreResult<()> {
        let node = graph.node(room)?;
        let room_id = persisted_id(graph, room)?;
        let desired = node
            .members()
            .into_iter()
            .flatten()
            .map(|&e| persisted_id(graph, e))
            .collect::<CoreResult<BTreeSet<_>>>()?;
        let current: BTreeSet<EntityId> = self.store.equipment_of(room_id)?.into_iter().collect();

        for &equipment in desired.difference(&current) {
            self.store.write_join(room_id, equipment)?;
            self.undo.push(Undo::DeleteJoin {
                room: room_id,
                equipment,
            });
            self.summary.joins_written += 1;
        }
        for &equipment in current.difference(&desired) {
            dropped.insert((room_id, equipment));
            self.delete_join(room_id, equipment)?;
        }
        Ok(())
    }

    fn delete_join(&mut self, room: EntityId, equipment: EntityId) -> CoreResult<()> {
        self.store.delete_join(room, equipment)?;
        self.undo.push(Undo::WriteJoin { room, equipment });
        self.summary.joins_deleted += 1;
        Ok(())
    }

    fn compensate(&mut self) {
        let applied = self.undo.len();
        while let Some(step) = self.undo.pop() {
            if let Err(err) = step.apply(self.store) {
                warn!(?step, error = %err, "compensation step failed");
            }
        }
        debug!(steps = applied, "compensated partial flush");
    }
}

fn persisted_id(graph: &EntityGraph, node: NodeId) -> CoreResult<EntityId> {
    let found = graph.node(node)?;
    found.id().ok_or_else(|| {
        CoreError::invalid_state(format!("{} {node} has not been written", found.kind()))
    })
}

fn position(seq: &[NodeId], node: NodeId) -> CoreResult<u32> {
    let index = seq
        .iter()
        .position(|&x| x == node)
        .ok_or_else(|| CoreError::invalid_state(format!("{node} missing from its holder")))?;
    u32::try_from(index).map_err(|_| CoreError::invalid_state("reservation sequence too long"))
}

/// Builds the row for a node from its attributes and current edges.
fn record_of(graph: &EntityGraph, node: NodeId) -> CoreResult<Record> {
    let record = match graph.node(node)?.body() {
        NodeBody::User { attrs, .. } => Record::User(attrs.into()),
        NodeBody::Room { attrs, .. } => Record::Room(attrs.into()),
        NodeBody::Equipment { attrs, .. } => Record::Equipment(attrs.into()),
        NodeBody::Reservation { attrs, owner, room } => {
            let owner = owner.ok_or_else(|| {
                CoreError::invalid_state(format!("reservation {node} has no owner"))
            })?;
            let (room_id, room_position) = match room {
                Some(room) => (
                    Some(persisted_id(graph, *room)?),
                    Some(position(graph.node(*room)?.reservations(), node)?),
                ),
                None => (None, None),
            };
            Record::Reservation(ReservationRecord {
                start: attrs.start,
                end: attrs.end,
                purpose: attrs.purpose.clone(),
                owner_id: persisted_id(graph, owner)?,
                owner_position: position(graph.node(owner)?.reservations(), node)?,
                room_id,
                room_position,
            })
        }
    };
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{plan, CascadePolicy};
    use crate::entity::{Entity, Equipment, Handle, Reservation, Room, User};
    use crate::graph::Node;
    use crate::relations::RelationshipManager;
    use crate::transaction::UnitOfWork;
    use chrono::{Duration, Utc};
    use resgraph_store::{Holder, InMemoryDatastore};

    fn add<E: Entity>(graph: &mut EntityGraph, unit: &mut UnitOfWork, entity: E) -> Handle<E> {
        Handle::new(
            graph
                .create(Node::transient(entity.into_body()), &mut unit.journal)
                .unwrap(),
        )
    }

    fn flush(graph: &mut EntityGraph, unit: &mut UnitOfWork, store: &InMemoryDatastore) -> CommitSummary {
        let plan = plan(graph, unit, &CascadePolicy::default()).unwrap();
        Executor::new(store, unit.txid())
            .execute(&plan, graph, &mut unit.journal)
            .unwrap()
    }

    #[test]
    fn writes_rows_with_foreign_keys_and_positions() {
        let store = InMemoryDatastore::new();
        let mut graph = EntityGraph::new();
        let mut unit = UnitOfWork::new(TransactionId::new(1));
        let user = add(&mut graph, &mut unit, User::new("Alhashemi", "Layla", "l@example.com"));
        let start = Utc::now();
        let first = add(&mut graph, &mut unit, Reservation::new(start, start + Duration::hours(1), "Interview"));
        let second = add(&mut graph, &mut unit, Reservation::new(start, start + Duration::hours(2), "Workshop"));
        let mut rel = RelationshipManager::new(&mut graph, &mut unit);
        rel.attach_reservation(user, first).unwrap();
        rel.attach_reservation(user, second).unwrap();
        unit.add_root(user.node_id());

        let summary = flush(&mut graph, &mut unit, &store);

        assert_eq!(summary.inserted, 3);
        let user_id = graph.node(user.node_id()).unwrap().id().unwrap();
        let rows = store.reservations_of(Holder::User(user_id)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1.purpose, "Interview");
        assert_eq!(rows[1].1.owner_position, 1);
        assert_eq!(
            graph.node(second.node_id()).unwrap().state(),
            LifecycleState::Managed
        );
    }

    #[test]
    fn joins_follow_membership() {
        let store = InMemoryDatastore::new();
        let mut graph = EntityGraph::new();
        let mut unit = UnitOfWork::new(TransactionId::new(1));
        let room = add(&mut graph, &mut unit, Room::new("Room Hassan", 25));
        let projector = add(&mut graph, &mut unit, Equipment::new("Projector", "HD projector"));
        let screen = add(&mut graph, &mut unit, Equipment::new("Interactive Screen", "65-inch"));
        let mut rel = RelationshipManager::new(&mut graph, &mut unit);
        rel.attach_equipment(room, projector).unwrap();
        rel.attach_equipment(room, screen).unwrap();
        unit.add_root(room.node_id());

        let summary = flush(&mut graph, &mut unit, &store);
        assert_eq!(summary.joins_written, 2);

        let mut next = UnitOfWork::new(TransactionId::new(2));
        RelationshipManager::new(&mut graph, &mut next)
            .detach_equipment(room, projector)
            .unwrap();
        let summary = flush(&mut graph, &mut next, &store);

        assert_eq!(summary.joins_deleted, 1);
        assert_eq!(store.join_count(), 1);
        assert_eq!(store.count(EntityKind::Equipment).unwrap(), 2);
    }
}
