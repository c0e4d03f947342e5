//! Relationship manager.
//!
//! The only way to change an association. Each operation validates every
//! node it touches before mutating anything, then updates both sides of
//! the edge, so a failed call leaves the graph exactly as it was and a
//! successful one leaves these holding:
//!
//! - `r` is in `u.reservations` iff `r.owner == u`
//! - `r` is in `room.reservations` iff `r.room == room`
//! - `room.equipment` contains `e` iff `e.rooms` contains `room`

use crate::entity::{Equipment, Handle, HolderSide, Reservation, ReservationHolder, Room};
use crate::error::{CoreError, CoreResult};
use crate::graph::{EntityGraph, Node};
use crate::transaction::UnitOfWork;
use crate::types::{LifecycleState, NodeId};
use tracing::debug;

/// Returns a node that may still be mutated.
pub(crate) fn ensure_live(graph: &EntityGraph, node: NodeId) -> CoreResult<&Node> {
    let found = graph.node(node)?;
    if found.state() == LifecycleState::Removed {
        return Err(CoreError::invalid_state(format!(
            "{} {node} has been removed",
            found.kind()
        )));
    }
    Ok(found)
}

/// Mutates associations inside an open transaction.
///
/// Obtained from [`crate::Transaction::relations`].
pub struct RelationshipManager<'a> {
    graph: &'a mut EntityGraph,
    unit: &'a mut UnitOfWork,
}

impl<'a> RelationshipManager<'a> {
    pub(crate) fn new(graph: &'a mut EntityGraph, unit: &'a mut UnitOfWork) -> Self {
        Self { graph, unit }
    }

    /// Attaches a reservation to a user (as owner) or a room.
    ///
    /// Idempotent if the reservation is already held by `holder`. On the
    /// room side a reservation held by another room is moved: it is removed
    /// from the previous room's sequence first.
    ///
    /// # Errors
    ///
    /// - `AlreadyOwned` if a different user owns the reservation
    /// - `InvalidState` if either node has been removed
    /// - `UnknownNode` for a stale handle
    pub fn attach_reservation<H: ReservationHolder>(
        &mut self,
        holder: Handle<H>,
        reservation: Handle<Reservation>,
    ) -> CoreResult<()> {
        let (h, r) = (holder.node_id(), reservation.node_id());
        ensure_live(self.graph, h)?;
        let current = ensure_live(self.graph, r)?.back_ref(H::SIDE);

        let previous = match current {
            Some(existing) if existing == h => return Ok(()),
            Some(existing) if H::SIDE == HolderSide::Owner => {
                return Err(CoreError::AlreadyOwned {
                    reservation: r,
                    holder_kind: H::KIND,
                    holder: existing,
                });
            }
            other => other,
        };

        let journal = &mut self.unit.journal;
        if let Some(previous) = previous {
            if let Some(seq) = self.graph.node_mut(previous, journal)?.reservations_mut() {
                seq.retain(|&x| x != r);
            }
            journal.mark_dirty(previous);
            debug!(reservation = %r, from = %previous, to = %h, "moving reservation between rooms");
        }

        self.graph
            .node_mut(r, journal)?
            .set_back_ref(H::SIDE, Some(h));
        if let Some(seq) = self.graph.node_mut(h, journal)?.reservations_mut() {
            if !seq.contains(&r) {
                seq.push(r);
            }
        }
        journal.mark_dirty(r);
        journal.mark_dirty(h);
        Ok(())
    }

    /// Detaches a reservation from a user or a room.
    ///
    /// A no-op if `holder` does not hold the reservation, including when the
    /// reservation has already been removed. Detaching from the owning user
    /// makes the reservation an orphan candidate, resolved at commit by the
    /// cascade policy.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the holder has been removed while still holding
    ///   the reservation
    /// - `UnknownNode` for a stale handle
    pub fn detach_reservation<H: ReservationHolder>(
        &mut self,
        holder: Handle<H>,
        reservation: Handle<Reservation>,
    ) -> CoreResult<()> {
        let (h, r) = (holder.node_id(), reservation.node_id());
        self.graph.node(h)?;
        let target = self.graph.node(r)?;
        if target.state() == LifecycleState::Removed || target.back_ref(H::SIDE) != Some(h) {
            return Ok(());
        }
        ensure_live(self.graph, h)?;

        let journal = &mut self.unit.journal;
        if let Some(seq) = self.graph.node_mut(h, journal)?.reservations_mut() {
            seq.retain(|&x| x != r);
        }
        self.graph.node_mut(r, journal)?.set_back_ref(H::SIDE, None);
        journal.mark_dirty(h);
        journal.mark_dirty(r);

        if H::SIDE == HolderSide::Owner {
            debug!(reservation = %r, "reservation orphaned");
            self.unit.add_orphan(r);
        }
        Ok(())
    }

    /// Adds equipment to a room, and the room to the equipment.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if either node has been removed
    /// - `UnknownNode` for a stale handle
    pub fn attach_equipment(
        &mut self,
        room: Handle<Room>,
        equipment: Handle<Equipment>,
    ) -> CoreResult<()> {
        self.edit_membership(room.node_id(), equipment.node_id(), true)
    }

    /// Removes equipment from a room, and the room from the equipment.
    ///
    /// Neither side is ever deleted; only the membership changes.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if either node has been removed
    /// - `UnknownNode` for a stale handle
    pub fn detach_equipment(
        &mut self,
        room: Handle<Room>,
        equipment: Handle<Equipment>,
    ) -> CoreResult<()> {
        self.edit_membership(room.node_id(), equipment.node_id(), false)
    }

    fn edit_membership(&mut self, room: NodeId, equipment: NodeId, insert: bool) -> CoreResult<()> {
        let present = ensure_live(self.graph, room)?
            .members()
            .is_some_and(|set| set.contains(&equipment));
        ensure_live(self.graph, equipment)?;
        if present == insert {
            return Ok(());
        }

        let journal = &mut self.unit.journal;
        for (node, partner) in [(room, equipment), (equipment, room)] {
            if let Some(set) = self.graph.node_mut(node, journal)?.members_mut() {
                if insert {
                    set.insert(partner);
                } else {
                    set.remove(&partner);
                }
            }
            journal.mark_dirty(node);
        }
        Ok(())
    }
}
