//! Cascade policy and commit-time flushing.
//!
//! At commit the transaction's mutations are turned into datastore calls:
//!
//! 1. Orphan candidates that are still ownerless are removed
//! 2. The cascade closure of the persist roots and dirty managed nodes is
//!    planned, owners before dependents
//! 3. The plan is executed; a store failure replays the inverse of every
//!    applied call and the graph is restored from the journal

mod apply;
mod plan;
mod policy;
mod remove;

pub(crate) use apply::Executor;
pub(crate) use plan::{plan, FlushPlan};
pub use policy::{CascadePolicy, CascadeRule};
pub(crate) use remove::{remove, resolve_orphans};
