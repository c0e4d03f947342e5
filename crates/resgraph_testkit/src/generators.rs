//! Property-based test generators using proptest.
//!
//! Provides strategies for entity attributes and for random sequences of
//! relationship operations over a fixed pool of entities.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use resgraph_core::{CoreError, CoreResult, Equipment, Handle, Reservation, Room, Transaction, User};
use resgraph_store::EntityId;

/// Strategy for generating entity IDs.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::array::uniform16(any::<u8>()).prop_map(EntityId::from_bytes)
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,11}").expect("Invalid regex")
}

/// Strategy for generating users.
pub fn user_strategy() -> impl Strategy<Value = User> {
    (name_strategy(), name_strategy()).prop_map(|(last, first)| {
        let email = format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase());
        User::new(last, first, email)
    })
}

/// Strategy for generating rooms.
pub fn room_strategy() -> impl Strategy<Value = Room> {
    (name_strategy(), 1u32..200, prop::option::of("[a-z ]{0,24}")).prop_map(
        |(name, capacity, description)| {
            let room = Room::new(format!("Room {name}"), capacity);
            match description {
                Some(text) => room.with_description(text),
                None => room,
            }
        },
    )
}

/// Strategy for generating reservations within a two-year window.
pub fn reservation_strategy() -> impl Strategy<Value = Reservation> {
    (0i64..730 * 24, 1i64..8, "[A-Z][a-z ]{2,20}").prop_map(|(offset, hours, purpose)| {
        let base = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let start = base + Duration::hours(offset);
        Reservation::new(start, start + Duration::hours(hours), purpose)
    })
}

/// Strategy for generating equipment.
pub fn equipment_strategy() -> impl Strategy<Value = Equipment> {
    (name_strategy(), "[a-z ]{0,24}").prop_map(|(name, description)| Equipment::new(name, description))
}

/// A relationship operation addressed by index into an [`EntityPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOp {
    /// Attach reservation `.1` to user `.0`.
    AttachOwner(usize, usize),
    /// Detach reservation `.1` from user `.0`.
    DetachOwner(usize, usize),
    /// Attach reservation `.1` to room `.0`.
    AttachRoom(usize, usize),
    /// Detach reservation `.1` from room `.0`.
    DetachRoom(usize, usize),
    /// Install equipment `.1` in room `.0`.
    AttachEquipment(usize, usize),
    /// Remove equipment `.1` from room `.0`.
    DetachEquipment(usize, usize),
}

/// Strategy for generating relationship operations over `size` entities of
/// each kind.
pub fn relation_op_strategy(size: usize) -> impl Strategy<Value = RelationOp> {
    let size = size.max(1);
    (0u8..6, 0..size, 0..size).prop_map(|(op, a, b)| match op {
        0 => RelationOp::AttachOwner(a, b),
        1 => RelationOp::DetachOwner(a, b),
        2 => RelationOp::AttachRoom(a, b),
        3 => RelationOp::DetachRoom(a, b),
        4 => RelationOp::AttachEquipment(a, b),
        _ => RelationOp::DetachEquipment(a, b),
    })
}

/// Strategy for generating a sequence of relationship operations.
pub fn relation_sequence_strategy(
    size: usize,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RelationOp>> {
    prop::collection::vec(relation_op_strategy(size), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

/// A fixed set of entities created in one transaction.
#[derive(Debug, Clone)]
pub struct EntityPool {
    /// Users.
    pub users: Vec<Handle<User>>,
    /// Rooms.
    pub rooms: Vec<Handle<Room>>,
    /// Reservations.
    pub reservations: Vec<Handle<Reservation>>,
    /// Equipment.
    pub equipment: Vec<Handle<Equipment>>,
}

impl EntityPool {
    /// Creates `size` transient entities of each kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer active.
    pub fn create(txn: &mut Transaction<'_>, size: usize) -> CoreResult<Self> {
        let mut pool = Self {
            users: Vec::new(),
            rooms: Vec::new(),
            reservations: Vec::new(),
            equipment: Vec::new(),
        };
        let start = Utc::now();
        for i in 0..size {
            pool.users
                .push(txn.create(User::new(format!("User{i}"), "Test", format!("u{i}@example.com")))?);
            pool.rooms.push(txn.create(Room::new(format!("Room {i}"), 10))?);
            pool.reservations.push(txn.create(Reservation::new(
                start,
                start + Duration::hours(1),
                format!("Slot {i}"),
            ))?);
            pool.equipment
                .push(txn.create(Equipment::new(format!("Gear {i}"), "test"))?);
        }
        Ok(pool)
    }

    /// Applies an operation. `AlreadyOwned` counts as an accepted outcome
    /// and is returned as `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns any other error from the relationship manager.
    pub fn apply(&self, txn: &mut Transaction<'_>, op: RelationOp) -> CoreResult<bool> {
        let result = match op {
            RelationOp::AttachOwner(u, r) => {
                txn.attach_reservation(self.users[u], self.reservations[r])
            }
            RelationOp::DetachOwner(u, r) => {
                txn.detach_reservation(self.users[u], self.reservations[r])
            }
            RelationOp::AttachRoom(room, r) => {
                txn.attach_reservation(self.rooms[room], self.reservations[r])
            }
            RelationOp::DetachRoom(room, r) => {
                txn.detach_reservation(self.rooms[room], self.reservations[r])
            }
            RelationOp::AttachEquipment(room, e) => {
                txn.attach_equipment(self.rooms[room], self.equipment[e])
            }
            RelationOp::DetachEquipment(room, e) => {
                txn.detach_equipment(self.rooms[room], self.equipment[e])
            }
        };
        match result {
            Ok(()) => Ok(true),
            Err(CoreError::AlreadyOwned { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Checks bidirectionality of every association in the pool through the
    /// public traversal API.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` describing the first asymmetric edge.
    pub fn check_symmetry(&self, txn: &Transaction<'_>) -> CoreResult<()> {
        for &user in &self.users {
            for r in txn.reservations_of(user)? {
                if txn.owner_of(r)? != Some(user) {
                    return Err(CoreError::invalid_state(format!("{r:?} not owned by {user:?}")));
                }
            }
        }
        for &room in &self.rooms {
            for r in txn.reservations_of(room)? {
                if txn.room_of(r)? != Some(room) {
                    return Err(CoreError::invalid_state(format!("{r:?} not in {room:?}")));
                }
            }
            for e in txn.equipment_of(room)? {
                if !txn.rooms_of(e)?.contains(&room) {
                    return Err(CoreError::invalid_state(format!("{e:?} does not list {room:?}")));
                }
            }
        }
        for &r in &self.reservations {
            if let Some(user) = txn.owner_of(r)? {
                if !txn.reservations_of(user)?.contains(&r) {
                    return Err(CoreError::invalid_state(format!("{user:?} does not list {r:?}")));
                }
            }
            if let Some(room) = txn.room_of(r)? {
                if !txn.reservations_of(room)?.contains(&r) {
                    return Err(CoreError::invalid_state(format!("{room:?} does not list {r:?}")));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn reservations_end_after_start(r in reservation_strategy()) {
            prop_assert!(r.end > r.start);
        }

        #[test]
        fn rooms_have_capacity(room in room_strategy()) {
            prop_assert!(room.capacity > 0);
            prop_assert!(room.name.starts_with("Room "));
        }

        #[test]
        fn ops_stay_in_range(ops in relation_sequence_strategy(3, 1, 20)) {
            for op in ops {
                let (a, b) = match op {
                    RelationOp::AttachOwner(a, b)
                    | RelationOp::DetachOwner(a, b)
                    | RelationOp::AttachRoom(a, b)
                    | RelationOp::DetachRoom(a, b)
                    | RelationOp::AttachEquipment(a, b)
                    | RelationOp::DetachEquipment(a, b) => (a, b),
                };
                prop_assert!(a < 3 && b < 3);
            }
        }
    }
}
