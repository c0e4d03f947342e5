//! Test fixtures and session helpers.
//!
//! Provides sessions backed by a [`FaultyDatastore`] and builders for the
//! reservation scenarios used across the test suites.

use crate::faulty::FaultyDatastore;
use chrono::{DateTime, Duration, Utc};
use resgraph_core::{
    Config, CoreResult, Equipment, Handle, Reservation, Room, Session, Transaction, User,
};
use resgraph_store::{Datastore, EntityId, EntityKind};
use std::sync::Arc;

/// A session over an in-memory store that can inject faults.
pub struct TestSession {
    /// The session under test.
    pub session: Session,
    /// The store behind the session.
    pub store: Arc<FaultyDatastore>,
}

impl TestSession {
    /// Creates a session with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a session with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(FaultyDatastore::in_memory());
        let session = Session::open(store.clone(), config).expect("invalid test configuration");
        Self { session, store }
    }

    /// Returns the number of stored rows of a kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.store.inner().count(kind).expect("count failed")
    }

    /// Returns the number of stored room/equipment join rows.
    pub fn joins(&self) -> usize {
        self.store.inner().join_count()
    }

    /// Returns `true` if the store holds a row for `(kind, id)`.
    pub fn stored(&self, kind: EntityKind, id: EntityId) -> bool {
        self.store
            .inner()
            .find(kind, id)
            .expect("find failed")
            .is_some()
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestSession {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

/// Runs a test with a fresh [`TestSession`].
///
/// # Example
///
/// ```rust
/// use resgraph_testkit::with_session;
///
/// with_session(|ts| {
///     assert_eq!(ts.graph_len(), 0);
/// });
/// ```
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&TestSession) -> R,
{
    let ts = TestSession::new();
    f(&ts)
}

/// A reservation slot starting `days` from now, lasting `hours`.
pub fn slot(days: i64, hours: i64, purpose: &str) -> Reservation {
    let start: DateTime<Utc> = Utc::now() + Duration::days(days);
    Reservation::new(start, start + Duration::hours(hours), purpose)
}

/// Handles created by [`cascade_scenario`].
#[derive(Debug, Clone, Copy)]
pub struct CascadeScenario {
    /// Ahmad Alshammari.
    pub user: Handle<User>,
    /// Room Aisha.
    pub room: Handle<Room>,
    /// The team meeting, owned by the user and held in the room.
    pub reservation: Handle<Reservation>,
}

/// One user and one room sharing one reservation; both persisted.
///
/// # Errors
///
/// Returns an error if any graph operation fails.
pub fn cascade_scenario(txn: &mut Transaction<'_>) -> CoreResult<CascadeScenario> {
    let user = txn.create(User::new(
        "Alshammari",
        "Ahmad",
        "ahmad.alshammari@example.com",
    ))?;
    let room = txn.create(
        Room::new("Room Aisha", 30).with_description("Team meeting room with a projector"),
    )?;
    let reservation = txn.create(slot(1, 2, "Team meeting"))?;

    txn.attach_reservation(user, reservation)?;
    txn.attach_reservation(room, reservation)?;
    txn.persist(user)?;
    txn.persist(room)?;

    Ok(CascadeScenario {
        user,
        room,
        reservation,
    })
}

/// Handles created by [`orphan_scenario`].
#[derive(Debug, Clone, Copy)]
pub struct OrphanScenario {
    /// Layla Alhashemi.
    pub user: Handle<User>,
    /// Room Omar, holding the interview.
    pub omar: Handle<Room>,
    /// Room Zainab, holding the training session.
    pub zainab: Handle<Room>,
    /// First reservation of the user.
    pub interview: Handle<Reservation>,
    /// Second reservation of the user.
    pub training: Handle<Reservation>,
}

/// One user with two reservations in two rooms; everything persisted.
///
/// # Errors
///
/// Returns an error if any graph operation fails.
pub fn orphan_scenario(txn: &mut Transaction<'_>) -> CoreResult<OrphanScenario> {
    let user = txn.create(User::new(
        "Alhashemi",
        "Layla",
        "layla.alhashemi@example.com",
    ))?;
    let omar = txn.create(Room::new("Room Omar", 20))?;
    txn.persist(omar)?;
    let zainab = txn.create(Room::new("Room Zainab", 15))?;
    txn.persist(zainab)?;

    let interview = txn.create(slot(2, 1, "Interview"))?;
    let training = txn.create(slot(3, 2, "Training session"))?;
    txn.attach_reservation(user, interview)?;
    txn.attach_reservation(user, training)?;
    txn.attach_reservation(omar, interview)?;
    txn.attach_reservation(zainab, training)?;
    txn.persist(user)?;

    Ok(OrphanScenario {
        user,
        omar,
        zainab,
        interview,
        training,
    })
}

/// Handles created by [`equipment_scenario`].
#[derive(Debug, Clone, Copy)]
pub struct EquipmentScenario {
    /// Room Hassan: projector and video conference system.
    pub hassan: Handle<Room>,
    /// Room Mariam: projector and interactive screen.
    pub mariam: Handle<Room>,
    /// Shared by both rooms.
    pub projector: Handle<Equipment>,
    /// Only in Room Mariam.
    pub screen: Handle<Equipment>,
    /// Only in Room Hassan.
    pub video: Handle<Equipment>,
}

/// Two rooms sharing a projector; rooms persisted, equipment by cascade.
///
/// # Errors
///
/// Returns an error if any graph operation fails.
pub fn equipment_scenario(txn: &mut Transaction<'_>) -> CoreResult<EquipmentScenario> {
    let projector = txn.create(Equipment::new("Projector", "HD projector"))?;
    let screen = txn.create(Equipment::new(
        "Interactive Screen",
        "65-inch touch screen",
    ))?;
    let video = txn.create(Equipment::new(
        "Video Conference System",
        "Full system with HD camera",
    ))?;
    let hassan = txn.create(Room::new("Room Hassan", 25))?;
    let mariam = txn.create(Room::new("Room Mariam", 40))?;

    txn.attach_equipment(hassan, projector)?;
    txn.attach_equipment(hassan, video)?;
    txn.attach_equipment(mariam, projector)?;
    txn.attach_equipment(mariam, screen)?;
    txn.persist(hassan)?;
    txn.persist(mariam)?;

    Ok(EquipmentScenario {
        hassan,
        mariam,
        projector,
        screen,
        video,
    })
}

/// Returns the names of a room's equipment, sorted.
///
/// # Errors
///
/// Returns `UnknownNode` for a stale handle.
pub fn equipment_names(txn: &Transaction<'_>, room: Handle<Room>) -> CoreResult<Vec<String>> {
    let mut names = txn
        .equipment_of(room)?
        .into_iter()
        .map(|e| txn.get(e).map(|e| e.name.clone()))
        .collect::<CoreResult<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_commit_cleanly() {
        with_session(|ts| {
            ts.transaction(cascade_scenario).unwrap();
            ts.transaction(orphan_scenario).unwrap();
            ts.transaction(equipment_scenario).unwrap();

            assert_eq!(ts.count(EntityKind::User), 2);
            assert_eq!(ts.count(EntityKind::Room), 5);
            assert_eq!(ts.count(EntityKind::Reservation), 3);
            assert_eq!(ts.count(EntityKind::Equipment), 3);
            assert_eq!(ts.joins(), 4);
        });
    }
}
