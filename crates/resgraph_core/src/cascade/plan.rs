//! Flush planning.
//!
//! Walks the cascade closure of the transaction's roots and orders the
//! resulting writes so that every foreign key points at a row that exists
//! by the time it is written.

use crate::cascade::CascadePolicy;
use crate::error::{CoreError, CoreResult};
use crate::graph::{EntityGraph, NodeBody};
use crate::transaction::UnitOfWork;
use crate::types::{LifecycleState, NodeId};
use resgraph_store::{EntityId, EntityKind};
use std::collections::HashSet;
use tracing::debug;

/// Ordered writes for one commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FlushPlan {
    /// Nodes to upsert: users, rooms and equipment first, then reservations.
    pub upserts: Vec<NodeId>,
    /// Flushed rooms whose join rows are synchronised.
    pub join_rooms: Vec<NodeId>,
    /// Rows to delete, reservations first.
    pub deletes: Vec<(EntityKind, EntityId)>,
}

impl FlushPlan {
    pub(crate) fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Builds the flush plan for a unit of work.
///
/// Roots are the explicit persist roots followed by every dirty managed
/// node. Dependents are reached depth-first in sequence order, following
/// only associations whose rule cascades persist. Each node is visited once.
///
/// # Errors
///
/// - `InvalidState` if a reservation to be written has no owner
/// - `TransientReference` if a written row would reference a transient
///   entity outside the plan
pub(crate) fn plan(
    graph: &EntityGraph,
    unit: &UnitOfWork,
    policy: &CascadePolicy,
) -> CoreResult<FlushPlan> {
    let dirty_managed = unit.journal.dirty().filter(|&id| {
        graph
            .node(id)
            .is_ok_and(|node| node.state() == LifecycleState::Managed)
    });
    let roots: Vec<NodeId> = unit.roots().iter().copied().chain(dirty_managed).collect();

    let mut visited: HashSet<(EntityKind, NodeId)> = HashSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<NodeId> = roots.into_iter().rev().collect();

    while let Some(id) = stack.pop() {
        let Ok(node) = graph.node(id) else {
            continue;
        };
        if node.state() == LifecycleState::Removed || !visited.insert((node.kind(), id)) {
            continue;
        }
        order.push(id);

        let mut dependents: Vec<NodeId> = Vec::new();
        match node.body() {
            NodeBody::User { reservations, .. } => {
                if policy.rule(EntityKind::User, EntityKind::Reservation).persist {
                    dependents.extend(reservations);
                }
            }
            NodeBody::Room {
                reservations,
                equipment,
                ..
            } => {
                if policy.rule(EntityKind::Room, EntityKind::Reservation).persist {
                    dependents.extend(reservations);
                }
                if policy.rule(EntityKind::Room, EntityKind::Equipment).persist {
                    dependents.extend(equipment);
                }
            }
            NodeBody::Reservation { .. } | NodeBody::Equipment { .. } => {}
        }
        stack.extend(dependents.into_iter().rev());
    }

    let (mut upserts, reservations): (Vec<_>, Vec<_>) = order
        .into_iter()
        .partition(|&id| graph.node(id).is_ok_and(|n| n.kind() != EntityKind::Reservation));
    upserts.extend(reservations);

    let planned: HashSet<NodeId> = upserts.iter().copied().collect();
    let mut join_rooms = Vec::new();
    for &id in &upserts {
        let node = graph.node(id)?;
        match node.body() {
            NodeBody::Reservation { owner, room, .. } => {
                let owner = owner.ok_or_else(|| {
                    CoreError::invalid_state(format!("reservation {id} has no owner"))
                })?;
                check_reference(graph, &planned, node.kind(), owner)?;
                if let Some(room) = room {
                    check_reference(graph, &planned, node.kind(), *room)?;
                }
            }
            NodeBody::Room { equipment, .. } => {
                for &e in equipment {
                    check_reference(graph, &planned, node.kind(), e)?;
                }
                join_rooms.push(id);
            }
            NodeBody::User { .. } | NodeBody::Equipment { .. } => {}
        }
    }

    let (mut deletes, others): (Vec<_>, Vec<_>) = unit
        .deletes()
        .iter()
        .copied()
        .partition(|(kind, _)| *kind == EntityKind::Reservation);
    deletes.extend(others);

    debug!(
        upserts = upserts.len(),
        deletes = deletes.len(),
        joins = join_rooms.len(),
        "planned flush"
    );
    Ok(FlushPlan {
        upserts,
        join_rooms,
        deletes,
    })
}

fn check_reference(
    graph: &EntityGraph,
    planned: &HashSet<NodeId>,
    from: EntityKind,
    target: NodeId,
) -> CoreResult<()> {
    let node = graph.node(target)?;
    if node.state() == LifecycleState::Managed || planned.contains(&target) {
        Ok(())
    } else {
        Err(CoreError::TransientReference {
            from,
            to: node.kind(),
            node: target,
        })
    }
}
