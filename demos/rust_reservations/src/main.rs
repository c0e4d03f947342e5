//! resgraph Example - Meeting Room Reservations
//!
//! This example walks through the three relationship styles:
//! - A reservation shared by its owning user and its room, persisted and
//!   deleted by cascade
//! - Orphan removal when a reservation loses its owner
//! - Equipment shared between rooms through a join table
//!
//! Run with: cargo run -p rust_reservations
//! Set `RUST_LOG=resgraph_core=debug` to trace every flush.

use chrono::{Duration, Utc};
use resgraph_core::{
    Config, CoreResult, Equipment, EntityKind, Handle, Reservation, Room, Session, Transaction,
    User,
};
use resgraph_store::{Datastore, InMemoryDatastore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn slot(days: i64, hours: i64, purpose: &str) -> Reservation {
    let start = Utc::now() + Duration::days(days);
    Reservation::new(start, start + Duration::hours(hours), purpose)
}

fn print_reservations<H: resgraph_core::ReservationHolder>(
    txn: &Transaction<'_>,
    label: &str,
    holder: Handle<H>,
) -> CoreResult<()> {
    let held = txn.reservations_of(holder)?;
    println!("  {label}: {} reservation(s)", held.len());
    for r in held {
        let reservation = txn.get(r)?;
        println!(
            "    - {} ({})",
            reservation.purpose,
            reservation.start.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn print_equipment(txn: &Transaction<'_>, room: Handle<Room>) -> CoreResult<()> {
    let name = &txn.get(room)?.name;
    let mut names = txn
        .equipment_of(room)?
        .into_iter()
        .map(|e| txn.get(e).map(|e| e.name.clone()))
        .collect::<CoreResult<Vec<_>>>()?;
    names.sort();
    println!("  {name}: {}", names.join(", "));
    Ok(())
}

fn print_counts(store: &InMemoryDatastore) -> Result<(), Box<dyn std::error::Error>> {
    let counts = EntityKind::ALL
        .iter()
        .map(|&kind| Ok(format!("{kind}={}", store.count(kind)?)))
        .collect::<Result<Vec<_>, resgraph_store::StoreError>>()?;
    println!(
        "  [store] {} joins={}",
        counts.join(" "),
        store.join_count()
    );
    Ok(())
}

fn cascade_demo(store: &Arc<InMemoryDatastore>) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n[1] Cascade persist and delete");
    let session = Session::open(store.clone(), Config::new())?;

    let (user, room) = session.transaction(|txn| {
        let user = txn.create(User::new(
            "Alshammari",
            "Ahmad",
            "ahmad.alshammari@example.com",
        ))?;
        let room = txn.create(
            Room::new("Room Aisha", 30).with_description("Team meeting room with a projector"),
        )?;
        let meeting = txn.create(slot(1, 2, "Team meeting"))?;
        txn.attach_reservation(user, meeting)?;
        txn.attach_reservation(room, meeting)?;
        txn.persist(user)?;
        txn.persist(room)?;
        Ok((user, room))
    })?;
    print_counts(store)?;

    let mut txn = session.begin();
    let user_id = txn.id_of(user)?.ok_or("user was not persisted")?;
    let room_id = txn.id_of(room)?.ok_or("room was not persisted")?;
    txn.clear()?;
    let user = txn.find::<User>(user_id)?.ok_or("user not found")?;
    let room = txn.find::<Room>(room_id)?.ok_or("room not found")?;
    println!("[*] Reloaded from the store:");
    print_reservations(&txn, &txn.get(user)?.full_name(), user)?;
    print_reservations(&txn, &txn.get(room)?.name, room)?;

    println!("[-] Removing the user...");
    txn.remove(user)?;
    let summary = txn.commit()?;
    info!(%summary, "user removed");

    let txn = session.begin();
    print_reservations(&txn, &txn.get(room)?.name, room)?;
    print_counts(store)?;
    Ok(())
}

fn orphan_demo(store: &Arc<InMemoryDatastore>) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n[2] Orphan removal");
    let session = Session::open(store.clone(), Config::new())?;

    let (user, interview) = session.transaction(|txn| {
        let user = txn.create(User::new(
            "Alhashemi",
            "Layla",
            "layla.alhashemi@example.com",
        ))?;
        let omar = txn.create(Room::new("Room Omar", 20))?;
        let zainab = txn.create(Room::new("Room Zainab", 15))?;
        txn.persist(omar)?;
        txn.persist(zainab)?;

        let interview = txn.create(slot(2, 1, "Interview"))?;
        let training = txn.create(slot(3, 2, "Training session"))?;
        txn.attach_reservation(user, interview)?;
        txn.attach_reservation(user, training)?;
        txn.attach_reservation(omar, interview)?;
        txn.attach_reservation(zainab, training)?;
        txn.persist(user)?;
        Ok((user, interview))
    })?;
    {
        let txn = session.begin();
        print_reservations(&txn, &txn.get(user)?.full_name(), user)?;
    }

    println!("[-] Detaching the interview from its owner...");
    let interview_id = session.transaction(|txn| {
        let id = txn.id_of(interview)?;
        txn.detach_reservation(user, interview)?;
        Ok(id)
    })?;

    let mut txn = session.begin();
    if let Some(id) = interview_id {
        let found = txn.find::<Reservation>(id)?;
        println!("  interview still stored: {}", found.is_some());
    }
    print_reservations(&txn, &txn.get(user)?.full_name(), user)?;
    drop(txn);
    print_counts(store)?;
    Ok(())
}

fn equipment_demo(store: &Arc<InMemoryDatastore>) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n[3] Shared equipment");
    let session = Session::open(store.clone(), Config::new())?;

    let (hassan, mariam) = session.transaction(|txn| {
        let projector = txn.create(Equipment::new("Projector", "HD projector"))?;
        let screen = txn.create(Equipment::new("Interactive Screen", "65-inch touch screen"))?;
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
        Ok((hassan, mariam))
    })?;
    {
        let txn = session.begin();
        print_equipment(&txn, hassan)?;
        print_equipment(&txn, mariam)?;
    }

    println!("[-] Moving the projector out of Room Hassan...");
    let mut txn = session.begin();
    let projector = txn
        .find_equipment_by_name("Projector")?
        .ok_or("projector not found")?;
    txn.detach_equipment(hassan, projector)?;
    let summary = txn.commit()?;
    info!(%summary, "projector detached");

    let mut txn = session.begin();
    print_equipment(&txn, hassan)?;
    print_equipment(&txn, mariam)?;
    let still_stored = txn.find_equipment_by_name("Projector")?.is_some();
    println!("  projector still stored: {still_stored}");
    drop(txn);
    print_counts(store)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Meeting Room Reservations Example");
    println!("=================================");

    let store = Arc::new(InMemoryDatastore::new());
    cascade_demo(&store)?;
    orphan_demo(&store)?;
    equipment_demo(&store)?;

    println!("\n[OK] Done");
    Ok(())
}
