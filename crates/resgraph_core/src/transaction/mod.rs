//! Sessions and transactions.
//!
//! resgraph groups graph mutations into transactions with:
//! - **Atomicity**: a commit either writes the whole cascade or nothing
//! - **Isolation**: one open transaction per session (single writer)
//! - **Rollback**: failed or abandoned transactions restore the graph

mod session;
mod state;
mod summary;
mod unit;

pub use session::Session;
pub use state::{Transaction, TransactionState};
pub use summary::CommitSummary;
pub(crate) use unit::UnitOfWork;
