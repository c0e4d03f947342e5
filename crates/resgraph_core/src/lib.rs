//! # resgraph Core
//!
//! Relationship engine for resgraph.
//!
//! This crate provides:
//! - An arena-backed entity graph of users, rooms, reservations and equipment
//! - A relationship manager that keeps every association bidirectional
//! - A cascade policy table driving cascade-persist, cascade-delete and
//!   orphan removal
//! - Transactions that flush the cascade closure to a
//!   [`resgraph_store::Datastore`] atomically, or restore the graph
//!
//! ## Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use resgraph_core::{Reservation, Room, Session, User};
//!
//! let session = Session::in_memory();
//! let mut txn = session.begin();
//! let ahmad = txn.create(User::new("Alshammari", "Ahmad", "ahmad@example.com"))?;
//! let aisha = txn.create(Room::new("Room Aisha", 30))?;
//! let start = Utc::now() + Duration::days(1);
//! let meeting = txn.create(Reservation::new(start, start + Duration::hours(2), "Team meeting"))?;
//! txn.attach_reservation(ahmad, meeting)?;
//! txn.attach_reservation(aisha, meeting)?;
//! txn.persist(ahmad)?;
//! txn.persist(aisha)?;
//! let summary = txn.commit()?;
//! assert_eq!(summary.inserted, 3);
//! # Ok::<(), resgraph_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cascade;
mod config;
mod entity;
mod error;
mod graph;
mod loader;
mod relations;
mod transaction;
mod types;

pub use cascade::{CascadePolicy, CascadeRule};
pub use config::Config;
pub use entity::{
    Detached, Entity, Equipment, Handle, HolderSide, Reservation, ReservationHolder, Room, User,
};
pub use error::{CoreError, CoreResult};
pub use graph::{EntityGraph, Journal, Node, NodeBody};
pub use relations::RelationshipManager;
pub use transaction::{CommitSummary, Session, Transaction, TransactionState};
pub use types::{LifecycleState, NodeId, TransactionId};

pub use resgraph_store::{EntityId, EntityKind};
