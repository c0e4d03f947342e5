//! Graph nodes.

use crate::entity::{Equipment, HolderSide, Reservation, Room, User};
use crate::types::{LifecycleState, NodeId};
use resgraph_store::{EntityId, EntityKind};
use std::collections::BTreeSet;

/// Attributes and association edges of a node.
///
/// Edges are node ids resolved through the graph; no node owns another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    /// A user and its ordered reservations.
    User {
        /// Attributes.
        attrs: User,
        /// Owned reservations, insertion order, no duplicates.
        reservations: Vec<NodeId>,
    },
    /// A room, its ordered reservations and its equipment set.
    Room {
        /// Attributes.
        attrs: Room,
        /// Reservations in this room, insertion order, no duplicates.
        reservations: Vec<NodeId>,
        /// Equipment installed in this room.
        equipment: BTreeSet<NodeId>,
    },
    /// A reservation and its back-references.
    Reservation {
        /// Attributes.
        attrs: Reservation,
        /// The owning user.
        owner: Option<NodeId>,
        /// The room, if any.
        room: Option<NodeId>,
    },
    /// An equipment and the rooms it is installed in.
    Equipment {
        /// Attributes.
        attrs: Equipment,
        /// Rooms containing this equipment.
        rooms: BTreeSet<NodeId>,
    },
}

impl NodeBody {
    /// Returns the entity kind of this body.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            NodeBody::User { .. } => EntityKind::User,
            NodeBody::Room { .. } => EntityKind::Room,
            NodeBody::Reservation { .. } => EntityKind::Reservation,
            NodeBody::Equipment { .. } => EntityKind::Equipment,
        }
    }
}

/// An entity registered in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: Option<EntityId>,
    state: LifecycleState,
    body: NodeBody,
}

impl Node {
    pub(crate) fn transient(body: NodeBody) -> Self {
        Self {
            id: None,
            state: LifecycleState::Transient,
            body,
        }
    }

    pub(crate) fn managed(id: EntityId, body: NodeBody) -> Self {
        Self {
            id: Some(id),
            state: LifecycleState::Managed,
            body,
        }
    }

    /// Returns the datastore identity, `None` while transient.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.body.kind()
    }

    /// Returns attributes and edges.
    #[must_use]
    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut NodeBody {
        &mut self.body
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    pub(crate) fn set_state(&mut self, state: LifecycleState) {
        self.state = state;
    }

    /// Returns the reservation sequence of a user or room; empty otherwise.
    #[must_use]
    pub fn reservations(&self) -> &[NodeId] {
        match &self.body {
            NodeBody::User { reservations, .. } | NodeBody::Room { reservations, .. } => {
                reservations
            }
            _ => &[],
        }
    }

    pub(crate) fn reservations_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.body {
            NodeBody::User { reservations, .. } | NodeBody::Room { reservations, .. } => {
                Some(reservations)
            }
            _ => None,
        }
    }

    /// Returns a reservation's owner or room reference.
    #[must_use]
    pub fn back_ref(&self, side: HolderSide) -> Option<NodeId> {
        match (&self.body, side) {
            (NodeBody::Reservation { owner, .. }, HolderSide::Owner) => *owner,
            (NodeBody::Reservation { room, .. }, HolderSide::Room) => *room,
            _ => None,
        }
    }

    pub(crate) fn set_back_ref(&mut self, side: HolderSide, value: Option<NodeId>) {
        match (&mut self.body, side) {
            (NodeBody::Reservation { owner, .. }, HolderSide::Owner) => *owner = value,
            (NodeBody::Reservation { room, .. }, HolderSide::Room) => *room = value,
            _ => {}
        }
    }

    /// Returns the many-to-many members: a room's equipment or an
    /// equipment's rooms.
    #[must_use]
    pub fn members(&self) -> Option<&BTreeSet<NodeId>> {
        match &self.body {
            NodeBody::Room { equipment, .. } => Some(equipment),
            NodeBody::Equipment { rooms, .. } => Some(rooms),
            _ => None,
        }
    }

    pub(crate) fn members_mut(&mut self) -> Option<&mut BTreeSet<NodeId>> {
        match &mut self.body {
            NodeBody::Room { equipment, .. } => Some(equipment),
            NodeBody::Equipment { rooms, .. } => Some(rooms),
            _ => None,
        }
    }

    pub(crate) fn strip_edges(&mut self) {
        match &mut self.body {
            NodeBody::User { reservations, .. } => reservations.clear(),
            NodeBody::Room {
                reservations,
                equipment,
                ..
            } => {
                reservations.clear();
                equipment.clear();
            }
            NodeBody::Reservation { owner, room, .. } => {
                *owner = None;
                *room = None;
            }
            NodeBody::Equipment { rooms, .. } => rooms.clear(),
        }
    }
}
