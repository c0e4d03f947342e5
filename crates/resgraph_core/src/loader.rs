//! Hydrates persisted entities into the graph.
//!
//! Loading an entity loads the whole connected subgraph reachable through
//! its associations, so every back-reference of a loaded node resolves to a
//! node in the graph. Entities already in the graph are never reloaded; the
//! identity map guarantees one node per persisted entity. A reloaded holder
//! is reconnected to the reservations it holds that stayed in the graph.

use crate::entity::{Entity, Equipment, HolderSide, Reservation, Room, User};
use crate::error::CoreResult;
use crate::graph::{EntityGraph, Journal, Node, NodeBody};
use crate::types::{LifecycleState, NodeId};
use resgraph_store::{Datastore, EntityId, EntityKind, Holder, Record};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::debug;

/// Rows and join pairs gathered from the store for one load.
#[derive(Debug, Default)]
struct Fetched {
    rows: Vec<(EntityId, Record)>,
    joins: BTreeSet<(EntityId, EntityId)>,
    /// Stored links from a loaded holder to reservations already in the graph.
    links: Vec<Link>,
}

#[derive(Debug)]
struct Link {
    side: HolderSide,
    holder: EntityId,
    reservation: EntityId,
    position: u32,
}

/// Returns the node holding `(kind, id)`, loading it from the store if the
/// graph does not hold it yet.
///
/// Returns `None` if the store has no such row, or if the graph holds it as
/// removed.
pub(crate) fn load(
    store: &dyn Datastore,
    graph: &mut EntityGraph,
    journal: &mut Journal,
    kind: EntityKind,
    id: EntityId,
) -> CoreResult<Option<NodeId>> {
    if let Some(node) = graph.resolve(kind, id) {
        let live = graph.node(node)?.state() != LifecycleState::Removed;
        return Ok(live.then_some(node));
    }

    let Some(record) = store.find(kind, id)? else {
        return Ok(None);
    };
    let fetched = fetch(store, graph, kind, id, record)?;
    debug!(%kind, %id, rows = fetched.rows.len(), "hydrating subgraph");
    hydrate(graph, journal, fetched)?;
    Ok(graph.resolve(kind, id))
}

fn fetch(
    store: &dyn Datastore,
    graph: &EntityGraph,
    kind: EntityKind,
    id: EntityId,
    record: Record,
) -> CoreResult<Fetched> {
    let mut fetched = Fetched::default();
    let mut seen = HashSet::from([(kind, id)]);
    let mut queue = VecDeque::from([(kind, id, Some(record))]);

    let mut enqueue = |queue: &mut VecDeque<_>, kind, id, record| {
        if graph.resolve(kind, id).is_none() && seen.insert((kind, id)) {
            queue.push_back((kind, id, record));
        }
    };

    while let Some((kind, id, record)) = queue.pop_front() {
        let record = match record {
            Some(record) => record,
            None => match store.find(kind, id)? {
                Some(record) => record,
                None => continue,
            },
        };

        match &record {
            Record::User(_) => {
                for (rid, row) in store.reservations_of(Holder::User(id))? {
                    if graph.resolve(EntityKind::Reservation, rid).is_some() {
                        fetched.links.push(Link {
                            side: HolderSide::Owner,
                            holder: id,
                            reservation: rid,
                            position: row.owner_position,
                        });
                    }
                    enqueue(&mut queue, EntityKind::Reservation, rid, Some(Record::Reservation(row)));
                }
            }
            Record::Room(_) => {
                for (rid, row) in store.reservations_of(Holder::Room(id))? {
                    if graph.resolve(EntityKind::Reservation, rid).is_some() {
                        fetched.links.push(Link {
                            side: HolderSide::Room,
                            holder: id,
                            reservation: rid,
                            position: row.room_position.unwrap_or(u32::MAX),
                        });
                    }
                    enqueue(&mut queue, EntityKind::Reservation, rid, Some(Record::Reservation(row)));
                }
                for equipment in store.equipment_of(id)? {
                    fetched.joins.insert((id, equipment));
                    enqueue(&mut queue, EntityKind::Equipment, equipment, None);
                }
            }
            Record::Reservation(row) => {
                enqueue(&mut queue, EntityKind::User, row.owner_id, None);
                if let Some(room) = row.room_id {
                    enqueue(&mut queue, EntityKind::Room, room, None);
                }
            }
            Record::Equipment(_) => {
                for room in store.rooms_of(id)? {
                    fetched.joins.insert((room, id));
                    enqueue(&mut queue, EntityKind::Room, room, None);
                }
            }
        }
        fetched.rows.push((id, record));
    }
    Ok(fetched)
}

fn body_of(record: &Record) -> NodeBody {
    match record {
        Record::User(row) => User::from(row.clone()).into_body(),
        Record::Room(row) => Room::from(row.clone()).into_body(),
        Record::Reservation(row) => Reservation::from(row).into_body(),
        Record::Equipment(row) => Equipment::from(row.clone()).into_body(),
    }
}

fn live(graph: &EntityGraph, kind: EntityKind, id: EntityId) -> Option<NodeId> {
    graph.lookup(kind, id).ok()
}

fn hydrate(graph: &mut EntityGraph, journal: &mut Journal, fetched: Fetched) -> CoreResult<()> {
    for (id, record) in &fetched.rows {
        graph.create(Node::managed(*id, body_of(record)), journal)?;
    }

    // holder -> (position, reservation)
    let mut sequences: BTreeMap<NodeId, Vec<(u32, NodeId)>> = BTreeMap::new();
    for (id, record) in &fetched.rows {
        let Record::Reservation(row) = record else {
            continue;
        };
        let Some(node) = graph.resolve(EntityKind::Reservation, *id) else {
            continue;
        };

        if let Some(owner) = live(graph, EntityKind::User, row.owner_id) {
            graph
                .node_mut(node, journal)?
                .set_back_ref(HolderSide::Owner, Some(owner));
            sequences
                .entry(owner)
                .or_default()
                .push((row.owner_position, node));
        }
        if let Some(room) = row.room_id.and_then(|room| live(graph, EntityKind::Room, room)) {
            graph
                .node_mut(node, journal)?
                .set_back_ref(HolderSide::Room, Some(room));
            sequences
                .entry(room)
                .or_default()
                .push((row.room_position.unwrap_or(u32::MAX), node));
        }
    }

    // Reservations that stayed in the graph while their holder was away.
    // One edited in this transaction keeps its in-memory edges.
    for link in &fetched.links {
        let (Some(reservation), Some(holder)) = (
            live(graph, EntityKind::Reservation, link.reservation),
            live(graph, link.side.kind(), link.holder),
        ) else {
            continue;
        };
        if journal.is_dirty(reservation) || graph.node(reservation)?.back_ref(link.side).is_some() {
            continue;
        }
        graph
            .node_mut(reservation, journal)?
            .set_back_ref(link.side, Some(holder));
        sequences
            .entry(holder)
            .or_default()
            .push((link.position, reservation));
    }

    for (holder, mut entries) in sequences {
        entries.sort_by_key(|(position, _)| *position);
        if let Some(seq) = graph.node_mut(holder, journal)?.reservations_mut() {
            for (_, reservation) in entries {
                if !seq.contains(&reservation) {
                    seq.push(reservation);
                }
            }
        }
    }

    for (room_id, equipment_id) in fetched.joins {
        let (Some(room), Some(equipment)) = (
            live(graph, EntityKind::Room, room_id),
            live(graph, EntityKind::Equipment, equipment_id),
        ) else {
            continue;
        };
        for (node, partner) in [(room, equipment), (equipment, room)] {
            if let Some(set) = graph.node_mut(node, journal)?.members_mut() {
                set.insert(partner);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use resgraph_store::{
        EquipmentRecord, InMemoryDatastore, ReservationRecord, RoomRecord, UserRecord,
    };

    struct Seeded {
        store: InMemoryDatastore,
        user: EntityId,
        room: EntityId,
        projector: EntityId,
        reservations: Vec<EntityId>,
    }

    fn seed() -> Seeded {
        let store = InMemoryDatastore::new();
        let user = store
            .upsert(None, &Record::User(UserRecord::new("Alhashemi", "Layla", "l@example.com")))
            .unwrap();
        let room = store
            .upsert(
                None,
                &Record::Room(RoomRecord {
                    name: "Room Hassan".into(),
                    capacity: 25,
                    description: None,
                }),
            )
            .unwrap();
        let projector = store
            .upsert(
                None,
                &Record::Equipment(EquipmentRecord {
                    name: "Projector".into(),
                    description: "HD projector".into(),
                }),
            )
            .unwrap();
        store.write_join(room, projector).unwrap();

        let start = Utc::now();
        // Written out of position order on purpose.
        let reservations = [(1, "Workshop"), (0, "Interview")]
            .into_iter()
            .map(|(position, purpose)| {
                store
                    .upsert(
                        None,
                        &Record::Reservation(ReservationRecord {
                            start,
                            end: start + Duration::hours(1),
                            purpose: purpose.into(),
                            owner_id: user,
                            owner_position: position,
                            room_id: Some(room),
                            room_position: Some(position),
                        }),
                    )
                    .unwrap()
            })
            .collect();

        Seeded {
            store,
            user,
            room,
            projector,
            reservations,
        }
    }

    #[test]
    fn loads_connected_subgraph_in_position_order() {
        let seeded = seed();
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();

        let projector = load(
            &seeded.store,
            &mut graph,
            &mut journal,
            EntityKind::Equipment,
            seeded.projector,
        )
        .unwrap()
        .unwrap();

        assert_eq!(graph.len(), 5);
        let user = graph.lookup(EntityKind::User, seeded.user).unwrap();
        let order: Vec<_> = graph
            .node(user)
            .unwrap()
            .reservations()
            .iter()
            .map(|&r| graph.node(r).unwrap().id().unwrap())
            .collect();
        assert_eq!(order, vec![seeded.reservations[1], seeded.reservations[0]]);

        let room = graph.lookup(EntityKind::Room, seeded.room).unwrap();
        assert!(graph.node(projector).unwrap().members().unwrap().contains(&room));
        assert!(!journal.is_dirty(room));
        graph.verify().unwrap();
    }

    #[test]
    fn second_load_hits_identity_map() {
        let seeded = seed();
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();

        let first = load(&seeded.store, &mut graph, &mut journal, EntityKind::User, seeded.user)
            .unwrap();
        let second = load(&seeded.store, &mut graph, &mut journal, EntityKind::User, seeded.user)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn reloaded_room_reconnects_reservations_left_in_graph() {
        let seeded = seed();
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        load(&seeded.store, &mut graph, &mut journal, EntityKind::User, seeded.user).unwrap();

        let room = graph.lookup(EntityKind::Room, seeded.room).unwrap();
        graph.evict(room, &mut journal).unwrap();
        assert_eq!(graph.len(), 4);

        let room = load(&seeded.store, &mut graph, &mut journal, EntityKind::Room, seeded.room)
            .unwrap()
            .unwrap();
        let order: Vec<_> = graph
            .node(room)
            .unwrap()
            .reservations()
            .iter()
            .map(|&r| graph.node(r).unwrap().id().unwrap())
            .collect();
        assert_eq!(order, vec![seeded.reservations[1], seeded.reservations[0]]);

        let projector = graph.lookup(EntityKind::Equipment, seeded.projector).unwrap();
        assert!(graph.node(projector).unwrap().members().unwrap().contains(&room));
        assert!(!journal.is_dirty(room));
        graph.verify().unwrap();
    }

    #[test]
    fn reload_keeps_reservation_moved_in_memory() {
        let seeded = seed();
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();
        load(&seeded.store, &mut graph, &mut journal, EntityKind::User, seeded.user).unwrap();

        let room = graph.lookup(EntityKind::Room, seeded.room).unwrap();
        let moved = graph.lookup(EntityKind::Reservation, seeded.reservations[0]).unwrap();
        graph.evict(room, &mut journal).unwrap();
        journal.mark_dirty(moved);

        let room = load(&seeded.store, &mut graph, &mut journal, EntityKind::Room, seeded.room)
            .unwrap()
            .unwrap();
        assert_eq!(graph.node(room).unwrap().reservations().len(), 1);
        assert_eq!(graph.node(moved).unwrap().back_ref(HolderSide::Room), None);
        graph.verify().unwrap();
    }

    #[test]
    fn missing_row_is_none() {
        let store = InMemoryDatastore::new();
        let mut graph = EntityGraph::new();
        let mut journal = Journal::new();

        let found = load(&store, &mut graph, &mut journal, EntityKind::Room, EntityId::new()).unwrap();
        assert_eq!(found, None);
        assert!(graph.is_empty());
    }
}
