//! Entity kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four kinds of entity the relationship graph manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A person who owns reservations.
    User,
    /// A bookable room.
    Room,
    /// A time slot owned by a user, optionally in a room.
    Reservation,
    /// Equipment shared between rooms.
    Equipment,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::Room,
        EntityKind::Reservation,
        EntityKind::Equipment,
    ];

    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Room => "room",
            EntityKind::Reservation => "reservation",
            EntityKind::Equipment => "equipment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
