//! Fault-injecting datastore wrapper.

use parking_lot::Mutex;
use resgraph_store::{
    Datastore, EntityId, EntityKind, EquipmentRecord, Holder, InMemoryDatastore, Record,
    ReservationRecord, StoreError, StoreResult,
};

/// A datastore operation, as seen by [`FaultyDatastore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `upsert`
    Upsert,
    /// `find`
    Find,
    /// `delete`
    Delete,
    /// `query_equipment_by_name`
    QueryByName,
    /// `write_join`
    WriteJoin,
    /// `delete_join`
    DeleteJoin,
    /// `reservations_of`, `equipment_of`, `rooms_of`
    Navigate,
    /// `count`
    Count,
}

#[derive(Debug)]
struct Fault {
    op: StoreOp,
    kind: Option<EntityKind>,
    nth: usize,
    seen: usize,
}

/// Wraps a datastore and fails chosen calls.
///
/// A fault fires once, on the `nth` (1-based) call matching its operation
/// and, if given, entity kind. Every call is recorded.
#[derive(Debug)]
pub struct FaultyDatastore<S = InMemoryDatastore> {
    inner: S,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<Vec<(StoreOp, Option<EntityKind>)>>,
}

impl FaultyDatastore {
    /// Wraps a fresh in-memory datastore.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(InMemoryDatastore::new())
    }
}

impl<S: Datastore> FaultyDatastore<S> {
    /// Wraps a datastore with no faults armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns the wrapped datastore.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Arms a fault on the `nth` call of `op`, optionally only counting
    /// calls for `kind`.
    pub fn fail_on(&self, op: StoreOp, kind: Option<EntityKind>, nth: usize) {
        self.faults.lock().push(Fault {
            op,
            kind,
            nth,
            seen: 0,
        });
    }

    /// Arms a fault on the `nth` upsert of a `kind` row.
    pub fn fail_nth_upsert(&self, kind: EntityKind, nth: usize) {
        self.fail_on(StoreOp::Upsert, Some(kind), nth);
    }

    /// Disarms every fault.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<(StoreOp, Option<EntityKind>)> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls of `op` made so far.
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|(o, _)| *o == op).count()
    }

    /// Forgets recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn check(&self, op: StoreOp, kind: Option<EntityKind>) -> StoreResult<()> {
        self.calls.lock().push((op, kind));

        let mut faults = self.faults.lock();
        let mut fired = None;
        for (index, fault) in faults.iter_mut().enumerate() {
            if fault.op != op || (fault.kind.is_some() && fault.kind != kind) {
                continue;
            }
            fault.seen += 1;
            if fault.seen == fault.nth && fired.is_none() {
                fired = Some(index);
            }
        }
        match fired {
            Some(index) => {
                let fault = faults.remove(index);
                Err(StoreError::unavailable(format!(
                    "injected failure on {:?} call {} ({:?})",
                    fault.op, fault.nth, fault.kind
                )))
            }
            None => Ok(()),
        }
    }
}

impl<S: Datastore> Datastore for FaultyDatastore<S> {
    fn upsert(&self, id: Option<EntityId>, record: &Record) -> StoreResult<EntityId> {
        self.check(StoreOp::Upsert, Some(record.kind()))?;
        self.inner.upsert(id, record)
    }

    fn find(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<Record>> {
        self.check(StoreOp::Find, Some(kind))?;
        self.inner.find(kind, id)
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        self.check(StoreOp::Delete, Some(kind))?;
        self.inner.delete(kind, id)
    }

    fn query_equipment_by_name(
        &self,
        name: &str,
    ) -> StoreResult<Option<(EntityId, EquipmentRecord)>> {
        self.check(StoreOp::QueryByName, Some(EntityKind::Equipment))?;
        self.inner.query_equipment_by_name(name)
    }

    fn write_join(&self, room_id: EntityId, equipment_id: EntityId) -> StoreResult<()> {
        self.check(StoreOp::WriteJoin, None)?;
        self.inner.write_join(room_id, equipment_id)
    }

    fn delete_join(&self, room_id: EntityId, equipment_id: EntityId) -> StoreResult<()> {
        self.check(StoreOp::DeleteJoin, None)?;
        self.inner.delete_join(room_id, equipment_id)
    }

    fn reservations_of(&self, holder: Holder) -> StoreResult<Vec<(EntityId, ReservationRecord)>> {
        self.check(StoreOp::Navigate, Some(EntityKind::Reservation))?;
        self.inner.reservations_of(holder)
    }

    fn equipment_of(&self, room_id: EntityId) -> StoreResult<Vec<EntityId>> {
        self.check(StoreOp::Navigate, Some(EntityKind::Equipment))?;
        self.inner.equipment_of(room_id)
    }

    fn rooms_of(&self, equipment_id: EntityId) -> StoreResult<Vec<EntityId>> {
        self.check(StoreOp::Navigate, Some(EntityKind::Room))?;
        self.inner.rooms_of(equipment_id)
    }

    fn count(&self, kind: EntityKind) -> StoreResult<usize> {
        self.check(StoreOp::Count, Some(kind))?;
        self.inner.count(kind)
    }
}
