//! Entity types and typed handles.
//!
//! The four entity kinds are plain attribute structs. Associations are never
//! stored on them; they live as edges between graph nodes and are reached
//! through a [`Handle`].

mod handle;
mod model;

pub use handle::{Detached, Handle};
pub use model::{Equipment, Reservation, Room, User};

use crate::graph::NodeBody;
use resgraph_store::EntityKind;
use std::fmt;

mod private {
    pub trait Sealed {}

    impl Sealed for super::User {}
    impl Sealed for super::Room {}
    impl Sealed for super::Reservation {}
    impl Sealed for super::Equipment {}
}

/// An entity type the graph can hold.
///
/// This trait is sealed; the graph manages exactly [`User`], [`Room`],
/// [`Reservation`] and [`Equipment`].
pub trait Entity: private::Sealed + Clone + fmt::Debug + Sized {
    /// The kind of this entity.
    const KIND: EntityKind;

    /// Wraps the attributes in a node body with no edges.
    #[doc(hidden)]
    fn into_body(self) -> NodeBody;

    /// Borrows the attributes out of a node body of this kind.
    #[doc(hidden)]
    fn from_body(body: &NodeBody) -> Option<&Self>;

    /// Mutably borrows the attributes out of a node body of this kind.
    #[doc(hidden)]
    fn from_body_mut(body: &mut NodeBody) -> Option<&mut Self>;
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn into_body(self) -> NodeBody {
        NodeBody::User {
            attrs: self,
            reservations: Vec::new(),
        }
    }

    fn from_body(body: &NodeBody) -> Option<&Self> {
        match body {
            NodeBody::User { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    fn from_body_mut(body: &mut NodeBody) -> Option<&mut Self> {
        match body {
            NodeBody::User { attrs, .. } => Some(attrs),
            _ => None,
        }
    }
}

impl Entity for Room {
    const KIND: EntityKind = EntityKind::Room;

    fn into_body(self) -> NodeBody {
        NodeBody::Room {
            attrs: self,
            reservations: Vec::new(),
            equipment: Default::default(),
        }
    }

    fn from_body(body: &NodeBody) -> Option<&Self> {
        match body {
            NodeBody::Room { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    fn from_body_mut(body: &mut NodeBody) -> Option<&mut Self> {
        match body {
            NodeBody::Room { attrs, .. } => Some(attrs),
            _ => None,
        }
    }
}

impl Entity for Reservation {
    const KIND: EntityKind = EntityKind::Reservation;

    fn into_body(self) -> NodeBody {
        NodeBody::Reservation {
            attrs: self,
            owner: None,
            room: None,
        }
    }

    fn from_body(body: &NodeBody) -> Option<&Self> {
        match body {
            NodeBody::Reservation { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    fn from_body_mut(body: &mut NodeBody) -> Option<&mut Self> {
        match body {
            NodeBody::Reservation { attrs, .. } => Some(attrs),
            _ => None,
        }
    }
}

impl Entity for Equipment {
    const KIND: EntityKind = EntityKind::Equipment;

    fn into_body(self) -> NodeBody {
        NodeBody::Equipment {
            attrs: self,
            rooms: Default::default(),
        }
    }

    fn from_body(body: &NodeBody) -> Option<&Self> {
        match body {
            NodeBody::Equipment { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    fn from_body_mut(body: &mut NodeBody) -> Option<&mut Self> {
        match body {
            NodeBody::Equipment { attrs, .. } => Some(attrs),
            _ => None,
        }
    }
}

/// Which back-reference of a reservation a holder occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolderSide {
    /// The owning user. Exactly one while the reservation exists.
    Owner,
    /// The room. Zero or one.
    Room,
}

impl HolderSide {
    /// Returns the entity kind that occupies this side.
    #[must_use]
    pub const fn kind(self) -> EntityKind {
        match self {
            HolderSide::Owner => EntityKind::User,
            HolderSide::Room => EntityKind::Room,
        }
    }
}

/// An entity that holds an ordered sequence of reservations.
pub trait ReservationHolder: Entity {
    /// The reservation back-reference this holder fills.
    const SIDE: HolderSide;
}

impl ReservationHolder for User {
    const SIDE: HolderSide = HolderSide::Owner;
}

impl ReservationHolder for Room {
    const SIDE: HolderSide = HolderSide::Room;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_roundtrip_keeps_attributes() {
        let room = Room::new("Room Aisha", 30).with_description("Team meeting room");
        let body = room.clone().into_body();
        assert_eq!(Room::from_body(&body), Some(&room));
        assert!(User::from_body(&body).is_none());
    }

    #[test]
    fn holder_sides_map_to_kinds() {
        assert_eq!(<User as ReservationHolder>::SIDE.kind(), EntityKind::User);
        assert_eq!(<Room as ReservationHolder>::SIDE.kind(), EntityKind::Room);
    }
}
