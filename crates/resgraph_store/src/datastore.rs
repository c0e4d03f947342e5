//! Datastore trait definition.

use crate::error::StoreResult;
use crate::id::EntityId;
use crate::kind::EntityKind;
use crate::record::{EquipmentRecord, Record, ReservationRecord};

/// An entity that holds an ordered sequence of reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holder {
    /// The owning user (`ReservationRecord::owner_id`).
    User(EntityId),
    /// The room (`ReservationRecord::room_id`).
    Room(EntityId),
}

/// Durable storage for entity rows and many-to-many membership rows.
///
/// Datastores are **row stores**. They persist what they are given and
/// assign identities; the relationship engine owns every association,
/// cascade and orphan rule.
///
/// # Invariants
///
/// - `upsert(None, row)` inserts and returns a fresh, never reused id
/// - `upsert(Some(id), row)` stores `row` under `id`, inserting if absent
/// - `delete` of a missing row and `write_join` of an existing join succeed
/// - Entity deletes never touch join rows, and join deletes never touch entities
/// - Implementations must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryDatastore`] - For tests, demos and ephemeral graphs
pub trait Datastore: Send + Sync {
    /// Inserts or updates a row, returning its identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be stored, or if `id` names a row
    /// of a different kind.
    fn upsert(&self, id: Option<EntityId>, record: &Record) -> StoreResult<EntityId>;

    /// Reads a row by kind and identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored row cannot be read back.
    fn find(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<Record>>;

    /// Deletes a row. Deleting a missing row is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the datastore cannot complete the delete.
    fn delete(&self, kind: EntityKind, id: EntityId) -> StoreResult<()>;

    /// Finds the first equipment row with exactly this name.
    ///
    /// # Errors
    ///
    /// Returns an error if stored rows cannot be read back.
    fn query_equipment_by_name(&self, name: &str)
        -> StoreResult<Option<(EntityId, EquipmentRecord)>>;

    /// Records that `room_id` contains `equipment_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the datastore cannot complete the write.
    fn write_join(&self, room_id: EntityId, equipment_id: EntityId) -> StoreResult<()>;

    /// Removes a room/equipment membership row. Missing rows are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the datastore cannot complete the delete.
    fn delete_join(&self, room_id: EntityId, equipment_id: EntityId) -> StoreResult<()>;

    /// Returns every reservation row whose foreign key points at `holder`.
    ///
    /// Rows are returned in ascending position order for that holder.
    ///
    /// # Errors
    ///
    /// Returns an error if stored rows cannot be read back.
    fn reservations_of(&self, holder: Holder) -> StoreResult<Vec<(EntityId, ReservationRecord)>>;

    /// Returns the equipment ids joined to a room.
    ///
    /// # Errors
    ///
    /// Returns an error if join rows cannot be read.
    fn equipment_of(&self, room_id: EntityId) -> StoreResult<Vec<EntityId>>;

    /// Returns the room ids joined to an equipment.
    ///
    /// # Errors
    ///
    /// Returns an error if join rows cannot be read.
    fn rooms_of(&self, equipment_id: EntityId) -> StoreResult<Vec<EntityId>>;

    /// Returns the number of rows of a kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the count cannot be determined.
    fn count(&self, kind: EntityKind) -> StoreResult<usize>;
}
