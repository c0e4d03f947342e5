//! Property tests over random relationship edits.

use proptest::prelude::*;
use resgraph_core::{Config, Equipment, Room, User};
use resgraph_store::EntityKind;
use resgraph_testkit::prelude::*;

const POOL: usize = 4;

fn config() -> ProptestConfig {
    PropTestConfig::quick().to_proptest_config()
}

/// Gives every ownerless reservation to the first user, then persists every
/// user and room.
fn settle(pool: &EntityPool, txn: &mut resgraph_core::Transaction<'_>) {
    for &r in &pool.reservations {
        if txn.owner_of(r).unwrap().is_none() {
            txn.attach_reservation(pool.users[0], r).unwrap();
        }
    }
    for &u in &pool.users {
        txn.persist(u).unwrap();
    }
    for &room in &pool.rooms {
        txn.persist(room).unwrap();
    }
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn random_edits_keep_associations_bidirectional(
        ops in relation_sequence_strategy(POOL, 1, 40),
    ) {
        let ts = TestSession::new();
        let mut txn = ts.begin();
        let pool = EntityPool::create(&mut txn, POOL).unwrap();

        for op in ops {
            pool.apply(&mut txn, op).unwrap();
            prop_assert!(pool.check_symmetry(&txn).is_ok());
        }
        prop_assert!(txn.graph().verify().is_ok());
    }

    #[test]
    fn owner_is_never_silently_replaced(
        ops in relation_sequence_strategy(POOL, 1, 40),
    ) {
        let ts = TestSession::new();
        let mut txn = ts.begin();
        let pool = EntityPool::create(&mut txn, POOL).unwrap();

        for op in ops {
            let before = match op {
                RelationOp::AttachOwner(_, r) => Some((r, txn.owner_of(pool.reservations[r]).unwrap())),
                _ => None,
            };
            let accepted = pool.apply(&mut txn, op).unwrap();
            if let (Some((r, Some(previous))), RelationOp::AttachOwner(u, _)) = (before, op) {
                prop_assert_eq!(accepted, previous == pool.users[u]);
                prop_assert_eq!(txn.owner_of(pool.reservations[r]).unwrap(), Some(previous));
            }
        }
    }

    #[test]
    fn committed_graph_reloads_with_same_shape(
        ops in relation_sequence_strategy(POOL, 1, 40),
    ) {
        let ts = TestSession::new();
        let mut txn = ts.begin();
        let pool = EntityPool::create(&mut txn, POOL).unwrap();
        for op in ops {
            pool.apply(&mut txn, op).unwrap();
        }
        settle(&pool, &mut txn);

        let memberships: usize = pool
            .rooms
            .iter()
            .map(|&room| txn.equipment_of(room).unwrap().len())
            .sum();
        let installed = pool
            .equipment
            .iter()
            .filter(|&&e| !txn.rooms_of(e).unwrap().is_empty())
            .count();
        let shape: Vec<(usize, Option<usize>)> = pool
            .reservations
            .iter()
            .map(|&r| {
                let owner = txn.owner_of(r).unwrap().unwrap();
                let room = txn.room_of(r).unwrap();
                (
                    pool.users.iter().position(|&u| u == owner).unwrap(),
                    room.and_then(|room| pool.rooms.iter().position(|&x| x == room)),
                )
            })
            .collect();
        txn.commit().unwrap();

        let txn = ts.begin();
        let user_ids: Vec<_> = pool.users.iter().map(|&u| txn.id_of(u).unwrap().unwrap()).collect();
        drop(txn);

        prop_assert_eq!(ts.count(EntityKind::User), POOL);
        prop_assert_eq!(ts.count(EntityKind::Room), POOL);
        prop_assert_eq!(ts.count(EntityKind::Reservation), POOL);
        prop_assert_eq!(ts.count(EntityKind::Equipment), installed);
        prop_assert_eq!(ts.joins(), memberships);

        let mut txn = ts.begin();
        txn.clear().unwrap();
        let mut reloaded = 0;
        for (index, id) in user_ids.into_iter().enumerate() {
            let user = txn.find::<User>(id).unwrap().unwrap();
            let expected = shape.iter().filter(|(owner, _)| *owner == index).count();
            prop_assert_eq!(txn.reservations_of(user).unwrap().len(), expected);
            reloaded += expected;
        }
        prop_assert_eq!(reloaded, POOL);
        prop_assert!(txn.graph().verify().is_ok());
    }

    #[test]
    fn repersisting_is_idempotent(
        ops in relation_sequence_strategy(POOL, 1, 30),
    ) {
        let ts = TestSession::new();
        let mut txn = ts.begin();
        let pool = EntityPool::create(&mut txn, POOL).unwrap();
        for op in ops {
            pool.apply(&mut txn, op).unwrap();
        }
        settle(&pool, &mut txn);
        txn.commit().unwrap();

        let counts: Vec<usize> = EntityKind::ALL.iter().map(|&k| ts.count(k)).collect();
        let joins = ts.joins();

        let mut txn = ts.begin();
        settle(&pool, &mut txn);
        let summary = txn.commit().unwrap();

        prop_assert_eq!(summary.inserted, 0);
        prop_assert_eq!(summary.deleted, 0);
        prop_assert_eq!(summary.joins_written, 0);
        prop_assert_eq!(summary.joins_deleted, 0);
        let after: Vec<usize> = EntityKind::ALL.iter().map(|&k| ts.count(k)).collect();
        prop_assert_eq!(after, counts);
        prop_assert_eq!(ts.joins(), joins);
    }

    #[test]
    fn unknown_identities_are_not_found(id in entity_id_strategy()) {
        let ts = TestSession::new();
        ts.transaction(equipment_scenario).unwrap();

        let mut txn = ts.begin();
        prop_assert!(txn.find::<Room>(id).unwrap().is_none());
        prop_assert!(txn.find::<Equipment>(id).unwrap().is_none());
    }

    #[test]
    fn generated_entities_round_trip_through_store(
        user in user_strategy(),
        room in room_strategy(),
        reservation in reservation_strategy(),
        equipment in equipment_strategy(),
    ) {
        let ts = TestSession::with_config(Config::new().clear_on_commit(true));
        let mut txn = ts.begin();
        let u = txn.create(user.clone()).unwrap();
        let rm = txn.create(room.clone()).unwrap();
        let r = txn.create(reservation.clone()).unwrap();
        let e = txn.create(equipment.clone()).unwrap();
        txn.attach_reservation(u, r).unwrap();
        txn.attach_reservation(rm, r).unwrap();
        txn.attach_equipment(rm, e).unwrap();
        txn.persist(u).unwrap();
        txn.persist(rm).unwrap();
        txn.commit().unwrap();
        prop_assert_eq!(ts.graph_len(), 0);

        let mut txn = ts.begin();
        let e = txn.find_equipment_by_name(&equipment.name).unwrap().unwrap();
        prop_assert_eq!(txn.get(e).unwrap(), &equipment);
        let rooms = txn.rooms_of(e).unwrap();
        prop_assert_eq!(rooms.len(), 1);
        prop_assert_eq!(txn.get(rooms[0]).unwrap(), &room);
        let held = txn.reservations_of(rooms[0]).unwrap();
        prop_assert_eq!(held.len(), 1);
        prop_assert_eq!(txn.get(held[0]).unwrap(), &reservation);
        let owner = txn.owner_of(held[0]).unwrap().unwrap();
        prop_assert_eq!(txn.get(owner).unwrap(), &user);
    }
}
