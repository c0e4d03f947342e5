//! Session: the shared graph and its single-writer lock.

use crate::config::Config;
use crate::error::CoreResult;
use crate::graph::EntityGraph;
use crate::transaction::state::Transaction;
use crate::types::TransactionId;
use parking_lot::Mutex;
use resgraph_store::{Datastore, InMemoryDatastore};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Owns the entity graph in front of a datastore.
///
/// All reads and writes of the graph go through a [`Transaction`]. Only one
/// transaction can be open at a time: [`Session::begin`] acquires an
/// exclusive lock on the graph that is held for the transaction's lifetime,
/// so no transaction ever observes another's uncommitted mutations.
///
/// Deleted entities stay in the graph as [`crate::LifecycleState::Removed`]
/// after commit, so their handles can still report it. The graph therefore
/// grows across commits until [`Transaction::clear`] or
/// [`Transaction::purge_removed`] runs, or the session is opened with
/// [`Config::purge_removed_on_commit`] or [`Config::clear_on_commit`].
///
/// # Example
///
/// ```rust
/// use resgraph_core::{Reservation, Session, User};
/// use chrono::{Duration, Utc};
///
/// let session = Session::in_memory();
/// session.transaction(|txn| {
///     let user = txn.create(User::new("Alshammari", "Ahmad", "ahmad@example.com"))?;
///     let start = Utc::now();
///     let meeting = txn.create(Reservation::new(start, start + Duration::hours(2), "Team meeting"))?;
///     txn.attach_reservation(user, meeting)?;
///     txn.persist(user)
/// })?;
/// # Ok::<(), resgraph_core::CoreError>(())
/// ```
pub struct Session {
    /// Durable storage.
    store: Arc<dyn Datastore>,
    /// Configuration.
    config: Config,
    /// The graph; the lock is the single-writer lock.
    graph: Mutex<EntityGraph>,
    /// Next transaction ID.
    next_txid: AtomicU64,
}

impl Session {
    /// Opens a session over a datastore.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the cascade policy is not valid.
    pub fn open(store: Arc<dyn Datastore>, config: Config) -> CoreResult<Self> {
        config.policy.validate()?;
        Ok(Self {
            store,
            config,
            graph: Mutex::new(EntityGraph::new()),
            next_txid: AtomicU64::new(1),
        })
    }

    /// Opens a session over a fresh [`InMemoryDatastore`] with the default
    /// configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryDatastore::new()),
            config: Config::default(),
            graph: Mutex::new(EntityGraph::new()),
            next_txid: AtomicU64::new(1),
        }
    }

    /// Returns the datastore.
    pub fn store(&self) -> &dyn Datastore {
        self.store.as_ref()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Begins a transaction, blocking while another one is open.
    pub fn begin(&self) -> Transaction<'_> {
        let graph = self.graph.lock();
        Transaction::new(self, graph, self.allocate_txid())
    }

    /// Begins a transaction if no other one is open.
    pub fn try_begin(&self) -> Option<Transaction<'_>> {
        let graph = self.graph.try_lock()?;
        Some(Transaction::new(self, graph, self.allocate_txid()))
    }

    /// Executes a function within a transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is rolled back.
    ///
    /// # Errors
    ///
    /// Returns the function's error, or the commit error.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut txn = self.begin();
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if txn.is_active() {
                    txn.rollback()?;
                }
                Err(err)
            }
        }
    }

    /// Returns the number of nodes in the graph, waiting for any open
    /// transaction to finish.
    #[must_use]
    pub fn graph_len(&self) -> usize {
        self.graph.lock().len()
    }

    fn allocate_txid(&self) -> TransactionId {
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        debug!(%txid, "begin");
        txid
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("next_txid", &self.next_txid.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{CascadePolicy, CascadeRule};
    use crate::entity::User;
    use crate::error::CoreError;
    use resgraph_store::EntityKind;

    #[test]
    fn open_rejects_invalid_policy() {
        let policy = CascadePolicy::default().with_rule(
            EntityKind::Room,
            EntityKind::Equipment,
            CascadeRule::ALL,
        );
        let result = Session::open(
            Arc::new(InMemoryDatastore::new()),
            Config::new().policy(policy),
        );
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
    }

    #[test]
    fn transaction_ids_increase() {
        let session = Session::in_memory();
        let first = session.begin().id();
        let second = session.begin().id();
        assert!(first < second);
    }

    #[test]
    fn second_writer_is_refused_while_open() {
        let session = Session::in_memory();
        let txn = session.begin();
        assert!(session.try_begin().is_none());
        drop(txn);
        assert!(session.try_begin().is_some());
    }

    #[test]
    fn failed_closure_rolls_back() {
        let session = Session::in_memory();
        let result: CoreResult<()> = session.transaction(|txn| {
            txn.create(User::new("Alhashemi", "Layla", "l@example.com"))?;
            Err(CoreError::invalid_operation("changed my mind"))
        });

        assert!(result.is_err());
        assert_eq!(session.graph_len(), 0);
    }
}
