//! In-memory datastore.

use crate::datastore::{Datastore, Holder};
use crate::error::{StoreError, StoreResult};
use crate::id::EntityId;
use crate::kind::EntityKind;
use crate::record::{EquipmentRecord, Record, ReservationRecord};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
struct Tables {
    /// Encoded rows keyed by kind and identity.
    rows: HashMap<(EntityKind, EntityId), Vec<u8>>,
    /// Room/equipment membership rows as `(room_id, equipment_id)`.
    joins: BTreeSet<(EntityId, EntityId)>,
}

/// A datastore that keeps every row in memory.
///
/// Rows are held as CBOR payloads, so every read decodes a fresh copy and
/// callers can never alias stored state. Suitable for:
/// - Unit and integration tests
/// - Demos
/// - Ephemeral graphs that don't need persistence
///
/// # Thread Safety
///
/// All tables sit behind a single `RwLock`; the datastore can be shared
/// across threads behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use resgraph_store::{Datastore, EntityKind, EquipmentRecord, InMemoryDatastore, Record};
///
/// let store = InMemoryDatastore::new();
/// let projector = Record::Equipment(EquipmentRecord {
///     name: "Projector".into(),
///     description: "HD projector".into(),
/// });
/// let id = store.upsert(None, &projector).unwrap();
/// let (found, _) = store.query_equipment_by_name("Projector").unwrap().unwrap();
/// assert_eq!(found, id);
/// assert_eq!(store.count(EntityKind::Equipment).unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDatastore {
    tables: RwLock<Tables>,
}

impl InMemoryDatastore {
    /// Creates an empty datastore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of join rows.
    #[must_use]
    pub fn join_count(&self) -> usize {
        self.tables.read().joins.len()
    }

    /// Returns every join row as `(room_id, equipment_id)`.
    #[must_use]
    pub fn joins(&self) -> Vec<(EntityId, EntityId)> {
        self.tables.read().joins.iter().copied().collect()
    }

    /// Removes all rows.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.rows.clear();
        tables.joins.clear();
    }

    fn decode_reservation(bytes: &[u8]) -> StoreResult<ReservationRecord> {
        match Record::decode(bytes)? {
            Record::Reservation(row) => Ok(row),
            other => Err(StoreError::KindMismatch {
                expected: EntityKind::Reservation,
                actual: other.kind(),
            }),
        }
    }
}

impl Datastore for InMemoryDatastore {
    fn upsert(&self, id: Option<EntityId>, record: &Record) -> StoreResult<EntityId> {
        let kind = record.kind();
        let payload = record.encode()?;
        let mut tables = self.tables.write();

        let id = match id {
            Some(id) => {
                let foreign = EntityKind::ALL
                    .into_iter()
                    .find(|&other| other != kind && tables.rows.contains_key(&(other, id)));
                if let Some(actual) = foreign {
                    return Err(StoreError::KindMismatch {
                        expected: kind,
                        actual,
                    });
                }
                id
            }
            None => EntityId::new(),
        };

        tables.rows.insert((kind, id), payload);
        Ok(id)
    }

    fn find(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<Record>> {
        let tables = self.tables.read();
        tables
            .rows
            .get(&(kind, id))
            .map(|bytes| Record::decode(bytes))
            .transpose()
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        self.tables.write().rows.remove(&(kind, id));
        Ok(())
    }

    fn query_equipment_by_name(
        &self,
        name: &str,
    ) -> StoreResult<Option<(EntityId, EquipmentRecord)>> {
        let tables = self.tables.read();
        let mut matches = Vec::new();
        for ((kind, id), bytes) in &tables.rows {
            if *kind != EntityKind::Equipment {
                continue;
            }
            if let Record::Equipment(row) = Record::decode(bytes)? {
                if row.name == name {
                    matches.push((*id, row));
                }
            }
        }
        // Lowest id wins so repeated queries are stable.
        matches.sort_by_key(|(id, _)| *id);
        Ok(matches.into_iter().next())
    }

    fn write_join(&self, room_id: EntityId, equipment_id: EntityId) -> StoreResult<()> {
        self.tables.write().joins.insert((room_id, equipment_id));
        Ok(())
    }

    fn delete_join(&self, room_id: EntityId, equipment_id: EntityId) -> StoreResult<()> {
        self.tables.write().joins.remove(&(room_id, equipment_id));
        Ok(())
    }

    fn reservations_of(&self, holder: Holder) -> StoreResult<Vec<(EntityId, ReservationRecord)>> {
        let tables = self.tables.read();
        let mut rows = Vec::new();
        for ((kind, id), bytes) in &tables.rows {
            if *kind != EntityKind::Reservation {
                continue;
            }
            let row = Self::decode_reservation(bytes)?;
            let position = match holder {
                Holder::User(owner) if row.owner_id == owner => Some(row.owner_position),
                Holder::Room(room) if row.room_id == Some(room) => row.room_position,
                _ => continue,
            };
            rows.push((position.unwrap_or(u32::MAX), *id, row));
        }
        rows.sort_by_key(|(position, id, _)| (*position, *id));
        Ok(rows.into_iter().map(|(_, id, row)| (id, row)).collect())
    }

    fn equipment_of(&self, room_id: EntityId) -> StoreResult<Vec<EntityId>> {
        Ok(self
            .tables
            .read()
            .joins
            .iter()
            .filter(|(room, _)| *room == room_id)
            .map(|(_, equipment)| *equipment)
            .collect())
    }

    fn rooms_of(&self, equipment_id: EntityId) -> StoreResult<Vec<EntityId>> {
        Ok(self
            .tables
            .read()
            .joins
            .iter()
            .filter(|(_, equipment)| *equipment == equipment_id)
            .map(|(room, _)| *room)
            .collect())
    }

    fn count(&self, kind: EntityKind) -> StoreResult<usize> {
        Ok(self
            .tables
            .read()
            .rows
            .keys()
            .filter(|(k, _)| *k == kind)
            .count())
    }
}
