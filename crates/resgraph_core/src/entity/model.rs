//! Entity attribute types.

use chrono::{DateTime, Utc};
use resgraph_store::{EquipmentRecord, ReservationRecord, RoomRecord, UserRecord};

/// A person who owns reservations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Family name.
    pub last_name: String,
    /// Given name.
    pub first_name: String,
    /// Contact address.
    pub email: String,
}

impl User {
    /// Creates a user.
    pub fn new(
        last_name: impl Into<String>,
        first_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            email: email.into(),
        }
    }

    /// Returns "first last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A bookable room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Display name.
    pub name: String,
    /// Seating capacity.
    pub capacity: u32,
    /// Free-form description.
    pub description: Option<String>,
}

impl Room {
    /// Creates a room without a description.
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A reserved time slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Start of the slot.
    pub start: DateTime<Utc>,
    /// End of the slot.
    pub end: DateTime<Utc>,
    /// Why the slot is reserved.
    pub purpose: String,
}

impl Reservation {
    /// Creates a reservation.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, purpose: impl Into<String>) -> Self {
        Self {
            start,
            end,
            purpose: purpose.into(),
        }
    }
}

/// Equipment shared between rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

impl Equipment {
    /// Creates an equipment.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        UserRecord::new(&user.last_name, &user.first_name, &user.email)
    }
}

impl From<UserRecord> for User {
    fn from(row: UserRecord) -> Self {
        Self {
            last_name: row.last_name,
            first_name: row.first_name,
            email: row.email,
        }
    }
}

impl From<&Room> for RoomRecord {
    fn from(room: &Room) -> Self {
        RoomRecord {
            name: room.name.clone(),
            capacity: room.capacity,
            description: room.description.clone(),
        }
    }
}

impl From<RoomRecord> for Room {
    fn from(row: RoomRecord) -> Self {
        Self {
            name: row.name,
            capacity: row.capacity,
            description: row.description,
        }
    }
}

impl From<&Equipment> for EquipmentRecord {
    fn from(equipment: &Equipment) -> Self {
        EquipmentRecord {
            name: equipment.name.clone(),
            description: equipment.description.clone(),
        }
    }
}

impl From<EquipmentRecord> for Equipment {
    fn from(row: EquipmentRecord) -> Self {
        Self {
            name: row.name,
            description: row.description,
        }
    }
}

impl From<&ReservationRecord> for Reservation {
    fn from(row: &ReservationRecord) -> Self {
        Self {
            start: row.start,
            end: row.end,
            purpose: row.purpose.clone(),
        }
    }
}
