//! Persisted row types.
//!
//! Rows carry entity attributes and, for reservations, the foreign keys and
//! order columns that let associations be rebuilt on load. Rows are encoded
//! as CBOR when a datastore keeps them as opaque payloads.

use crate::error::{StoreError, StoreResult};
use crate::id::EntityId;
use crate::kind::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Family name.
    pub last_name: String,
    /// Given name.
    pub first_name: String,
    /// Contact address.
    pub email: String,
}

impl UserRecord {
    /// Creates a user row.
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
}

/// A room row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Display name.
    pub name: String,
    /// Seating capacity.
    pub capacity: u32,
    /// Free-form description.
    pub description: Option<String>,
}

/// A reservation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// Start of the reserved slot.
    pub start: DateTime<Utc>,
    /// End of the reserved slot.
    pub end: DateTime<Utc>,
    /// Why the slot is reserved.
    pub purpose: String,
    /// The owning user.
    pub owner_id: EntityId,
    /// Index of this reservation in the owner's sequence.
    pub owner_position: u32,
    /// The room, if any.
    pub room_id: Option<EntityId>,
    /// Index of this reservation in the room's sequence.
    pub room_position: Option<u32>,
}

/// An equipment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    /// Display name, used for lookup by name.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// A row of any entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    /// A user row.
    User(UserRecord),
    /// A room row.
    Room(RoomRecord),
    /// A reservation row.
    Reservation(ReservationRecord),
    /// An equipment row.
    Equipment(EquipmentRecord),
}

impl Record {
    /// Returns the kind of entity this row stores.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Record::User(_) => EntityKind::User,
            Record::Room(_) => EntityKind::Room,
            Record::Reservation(_) => EntityKind::Reservation,
            Record::Equipment(_) => EntityKind::Equipment,
        }
    }

    /// Encodes the row to CBOR bytes.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| StoreError::codec(e.to_string()))?;
        Ok(bytes)
    }

    /// Decodes a row from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| StoreError::codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn kind_matches_variant() {
        let row = Record::Equipment(EquipmentRecord {
            name: "Projector".into(),
            description: "HD projector".into(),
        });
        assert_eq!(row.kind(), EntityKind::Equipment);
    }

    #[test]
    fn reservation_row_survives_encoding() {
        let start = Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).unwrap();
        let row = Record::Reservation(ReservationRecord {
            start,
            end: start + chrono::Duration::hours(2),
            purpose: "Team meeting".into(),
            owner_id: EntityId::new(),
            owner_position: 0,
            room_id: None,
            room_position: None,
        });

        let bytes = row.encode().unwrap();
        assert_eq!(Record::decode(&bytes).unwrap(), row);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = Record::decode(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(StoreError::Codec { .. })));
    }
}
