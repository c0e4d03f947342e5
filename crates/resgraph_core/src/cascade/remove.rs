//! Explicit removal and orphan resolution.

use crate::cascade::CascadePolicy;
use crate::entity::HolderSide;
use crate::error::CoreResult;
use crate::graph::{EntityGraph, NodeBody};
use crate::transaction::UnitOfWork;
use crate::types::{LifecycleState, NodeId};
use resgraph_store::EntityKind;
use tracing::debug;

/// Removes a node and applies the delete cascade.
///
/// Every partner loses its edge to the node. Persisted nodes become
/// [`LifecycleState::Removed`] and their row delete is queued; transient
/// nodes are discarded from the graph. Equipment is never removed as a
/// consequence of removing a room. Removing a removed node is a no-op.
pub(crate) fn remove(
    graph: &mut EntityGraph,
    unit: &mut UnitOfWork,
    policy: &CascadePolicy,
    node: NodeId,
) -> CoreResult<()> {
    let target = graph.node(node)?;
    if target.state() == LifecycleState::Removed {
        return Ok(());
    }
    let body = target.body().clone();

    match body {
        NodeBody::Reservation { owner, room, .. } => {
            for holder in owner.into_iter().chain(room) {
                if let Some(seq) = graph.node_mut(holder, &mut unit.journal)?.reservations_mut() {
                    seq.retain(|&r| r != node);
                }
                unit.journal.mark_dirty(holder);
            }
            let target = graph.node_mut(node, &mut unit.journal)?;
            target.set_back_ref(HolderSide::Owner, None);
            target.set_back_ref(HolderSide::Room, None);
        }
        NodeBody::User { reservations, .. } => {
            let cascade = policy.rule(EntityKind::User, EntityKind::Reservation).delete;
            for r in reservations {
                if cascade {
                    remove(graph, unit, policy, r)?;
                } else {
                    graph
                        .node_mut(r, &mut unit.journal)?
                        .set_back_ref(HolderSide::Owner, None);
                    unit.journal.mark_dirty(r);
                    unit.add_orphan(r);
                }
            }
            if let Some(seq) = graph.node_mut(node, &mut unit.journal)?.reservations_mut() {
                seq.clear();
            }
        }
        NodeBody::Room {
            reservations,
            equipment,
            ..
        } => {
            let cascade = policy.rule(EntityKind::Room, EntityKind::Reservation).delete;
            for r in reservations {
                if cascade {
                    remove(graph, unit, policy, r)?;
                } else {
                    graph
                        .node_mut(r, &mut unit.journal)?
                        .set_back_ref(HolderSide::Room, None);
                    unit.journal.mark_dirty(r);
                }
            }
            for e in equipment {
                if let Some(rooms) = graph.node_mut(e, &mut unit.journal)?.members_mut() {
                    rooms.remove(&node);
                }
            }
            graph.node_mut(node, &mut unit.journal)?.strip_edges();
        }
        NodeBody::Equipment { rooms, .. } => {
            for room in rooms {
                if let Some(set) = graph.node_mut(room, &mut unit.journal)?.members_mut() {
                    set.remove(&node);
                }
                unit.journal.mark_dirty(room);
            }
            graph.node_mut(node, &mut unit.journal)?.strip_edges();
        }
    }

    let target = graph.node(node)?;
    let kind = target.kind();
    match target.id() {
        Some(id) => {
            debug!(%kind, %id, "scheduling delete");
            unit.schedule_delete(kind, id);
            graph
                .node_mut(node, &mut unit.journal)?
                .set_state(LifecycleState::Removed);
        }
        None => {
            debug!(%kind, %node, "discarding transient entity");
            graph.evict(node, &mut unit.journal)?;
        }
    }
    Ok(())
}

/// Deletes orphan candidates that are still ownerless.
///
/// A candidate re-attached to an owner since it was orphaned is kept, as is
/// any candidate when the policy disables orphan removal.
pub(crate) fn resolve_orphans(
    graph: &mut EntityGraph,
    unit: &mut UnitOfWork,
    policy: &CascadePolicy,
) -> CoreResult<usize> {
    if !policy
        .rule(EntityKind::User, EntityKind::Reservation)
        .orphan_removal
    {
        return Ok(0);
    }

    let mut removed = 0;
    for candidate in unit.take_orphans() {
        let Ok(node) = graph.node(candidate) else {
            continue;
        };
        if node.state() == LifecycleState::Removed || node.back_ref(HolderSide::Owner).is_some() {
            continue;
        }
        remove(graph, unit, policy, candidate)?;
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Equipment, Handle, Reservation, Room, User};
    use crate::graph::Node;
    use crate::relations::RelationshipManager;
    use crate::types::TransactionId;
    use chrono::{Duration, Utc};
    use resgraph_store::EntityId;

    fn managed<E: Entity>(graph: &mut EntityGraph, unit: &mut UnitOfWork, entity: E) -> Handle<E> {
        let node = graph
            .create(Node::managed(EntityId::new(), entity.into_body()), &mut unit.journal)
            .unwrap();
        Handle::new(node)
    }

    fn slot(purpose: &str) -> Reservation {
        let start = Utc::now();
        Reservation::new(start, start + Duration::hours(1), purpose)
    }

    #[test]
    fn removing_user_cascades_to_reservations() {
        let mut graph = EntityGraph::new();
        let mut unit = UnitOfWork::new(TransactionId::new(1));
        let policy = CascadePolicy::default();
        let user = managed(&mut graph, &mut unit, User::new("Alhashemi", "Layla", "l@example.com"));
        let room = managed(&mut graph, &mut unit, Room::new("Room Aisha", 30));
        let r = managed(&mut graph, &mut unit, slot("Interview"));
        let mut rel = RelationshipManager::new(&mut graph, &mut unit);
        rel.attach_reservation(user, r).unwrap();
        rel.attach_reservation(room, r).unwrap();

        remove(&mut graph, &mut unit, &policy, user.node_id()).unwrap();

        assert_eq!(graph.node(r.node_id()).unwrap().state(), LifecycleState::Removed);
        assert!(graph.node(room.node_id()).unwrap().reservations().is_empty());
        assert_eq!(unit.deletes().len(), 2);
        assert_eq!(unit.deletes()[0].0, EntityKind::Reservation);
        graph.verify().unwrap();
    }

    #[test]
    fn removing_room_keeps_equipment_and_reservations() {
        let mut graph = EntityGraph::new();
        let mut unit = UnitOfWork::new(TransactionId::new(1));
        let policy = CascadePolicy::default();
        let user = managed(&mut graph, &mut unit, User::new("Alshammari", "Ahmad", "a@example.com"));
        let room = managed(&mut graph, &mut unit, Room::new("Room Hassan", 25));
        let projector = managed(&mut graph, &mut unit, Equipment::new("Projector", "HD"));
        let r = managed(&mut graph, &mut unit, slot("Workshop"));
        let mut rel = RelationshipManager::new(&mut graph, &mut unit);
        rel.attach_reservation(user, r).unwrap();
        rel.attach_reservation(room, r).unwrap();
        rel.attach_equipment(room, projector).unwrap();

        remove(&mut graph, &mut unit, &policy, room.node_id()).unwrap();

        let reservation = graph.node(r.node_id()).unwrap();
        assert_eq!(reservation.state(), LifecycleState::Managed);
        assert_eq!(reservation.back_ref(HolderSide::Room), None);
        let equipment = graph.node(projector.node_id()).unwrap();
        assert_eq!(equipment.state(), LifecycleState::Managed);
        assert!(equipment.members().unwrap().is_empty());
        assert_eq!(unit.deletes(), &[(EntityKind::Room, graph.node(room.node_id()).unwrap().id().unwrap())]);
    }

    #[test]
    fn transient_removal_discards_node() {
        let mut graph = EntityGraph::new();
        let mut unit = UnitOfWork::new(TransactionId::new(1));
        let node = graph
            .create(Node::transient(Room::new("Room Omar", 8).into_body()), &mut unit.journal)
            .unwrap();

        remove(&mut graph, &mut unit, &CascadePolicy::default(), node).unwrap();

        assert!(!graph.contains(node));
        assert!(unit.deletes().is_empty());
    }

    #[test]
    fn reattached_orphan_survives() {
        let mut graph = EntityGraph::new();
        let mut unit = UnitOfWork::new(TransactionId::new(1));
        let policy = CascadePolicy::default();
        let layla = managed(&mut graph, &mut unit, User::new("Alhashemi", "Layla", "l@example.com"));
        let ahmad = managed(&mut graph, &mut unit, User::new("Alshammari", "Ahmad", "a@example.com"));
        let kept = managed(&mut graph, &mut unit, slot("Interview"));
        let dropped = managed(&mut graph, &mut unit, slot("Workshop"));
        let mut rel = RelationshipManager::new(&mut graph, &mut unit);
        rel.attach_reservation(layla, kept).unwrap();
        rel.attach_reservation(layla, dropped).unwrap();
        rel.detach_reservation(layla, kept).unwrap();
        rel.detach_reservation(layla, dropped).unwrap();
        rel.attach_reservation(ahmad, kept).unwrap();

        let removed = resolve_orphans(&mut graph, &mut unit, &policy).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(graph.node(kept.node_id()).unwrap().state(), LifecycleState::Managed);
        assert_eq!(graph.node(dropped.node_id()).unwrap().state(), LifecycleState::Removed);
    }
}
