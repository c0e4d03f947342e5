//! # resgraph Store
//!
//! The datastore contract the relationship engine persists through, and an
//! in-memory implementation of it.
//!
//! This crate is the lowest layer of resgraph. A datastore is a **row store**:
//! it keeps one row per entity keyed by `(EntityKind, EntityId)` plus
//! many-to-many membership rows, and knows nothing about associations,
//! cascades or orphans.
//!
//! ## Design Principles
//!
//! - Datastores assign surrogate identities on first insert
//! - `upsert` and `delete` are idempotent under retry
//! - Foreign keys live on the dependent row (reservation -> owner, room)
//! - Must be `Send + Sync` so a session can share it
//!
//! ## Example
//!
//! ```rust
//! use resgraph_store::{Datastore, EntityKind, InMemoryDatastore, Record, UserRecord};
//!
//! let store = InMemoryDatastore::new();
//! let row = Record::User(UserRecord::new("Alshammari", "Ahmad", "ahmad@example.com"));
//! let id = store.upsert(None, &row).unwrap();
//! assert_eq!(store.find(EntityKind::User, id).unwrap(), Some(row));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod datastore;
mod error;
mod id;
mod kind;
mod memory;
mod record;

pub use datastore::{Datastore, Holder};
pub use error::{StoreError, StoreResult};
pub use id::EntityId;
pub use kind::EntityKind;
pub use memory::InMemoryDatastore;
pub use record::{EquipmentRecord, Record, ReservationRecord, RoomRecord, UserRecord};
