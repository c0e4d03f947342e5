//! Transaction state.

use crate::cascade::{self, Executor};
use crate::entity::{
    Detached, Entity, Equipment, Handle, HolderSide, Reservation, ReservationHolder, Room, User,
};
use crate::error::{CoreError, CoreResult};
use crate::graph::{EntityGraph, Journal, Node};
use crate::loader;
use crate::relations::{ensure_live, RelationshipManager};
use crate::transaction::session::Session;
use crate::transaction::summary::CommitSummary;
use crate::transaction::unit::UnitOfWork;
use crate::types::{LifecycleState, NodeId, TransactionId};
use parking_lot::MutexGuard;
use resgraph_store::EntityId;
use tracing::{debug, info};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// A unit of work against the session's graph.
///
/// Every mutation is recorded so the graph can be reverted: committing
/// flushes the changes through the cascade policy, and rolling back (or
/// dropping the transaction while active) restores the graph to its state
/// at [`Session::begin`].
///
/// Nothing reaches the datastore before [`Transaction::commit`]; entity
/// loads through [`Transaction::find`] are the only store reads.
pub struct Transaction<'s> {
    session: &'s Session,
    graph: MutexGuard<'s, EntityGraph>,
    unit: UnitOfWork,
    state: TransactionState,
    abort_reason: Option<String>,
}

impl<'s> Transaction<'s> {
    pub(crate) fn new(
        session: &'s Session,
        graph: MutexGuard<'s, EntityGraph>,
        id: TransactionId,
    ) -> Self {
        Self {
            session,
            graph,
            unit: UnitOfWork::new(id),
            state: TransactionState::Active,
            abort_reason: None,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.unit.txid()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the graph as seen by this transaction.
    #[must_use]
    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Returns the changes recorded so far.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.unit.journal
    }

    // --- entities ---

    /// Registers a new transient entity. No store interaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer active.
    pub fn create<E: Entity>(&mut self, entity: E) -> CoreResult<Handle<E>> {
        self.ensure_active()?;
        let node = self
            .graph
            .create(Node::transient(entity.into_body()), &mut self.unit.journal)?;
        debug!(kind = %E::KIND, %node, "created");
        Ok(Handle::new(node))
    }

    /// Marks an entity as a cascade-persist root.
    ///
    /// The entity and its cascade closure are written at commit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a removed entity, `UnknownNode` for a
    /// stale handle.
    pub fn persist<E: Entity>(&mut self, handle: Handle<E>) -> CoreResult<()> {
        self.ensure_active()?;
        ensure_live(&self.graph, handle.node_id())?;
        self.unit.add_root(handle.node_id());
        Ok(())
    }

    /// Removes an entity, applying the delete cascade.
    ///
    /// A persisted entity becomes [`LifecycleState::Removed`] and its row is
    /// deleted at commit; a transient one is discarded immediately.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn remove<E: Entity>(&mut self, handle: Handle<E>) -> CoreResult<()> {
        self.ensure_active()?;
        cascade::remove(
            &mut self.graph,
            &mut self.unit,
            &self.session.config().policy,
            handle.node_id(),
        )
    }

    /// Edits an entity's attributes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a removed entity, `UnknownNode` for a
    /// stale handle.
    pub fn update<E: Entity>(&mut self, handle: Handle<E>, f: impl FnOnce(&mut E)) -> CoreResult<()> {
        self.ensure_active()?;
        let node = handle.node_id();
        ensure_live(&self.graph, node)?;
        let body = self.graph.node_mut(node, &mut self.unit.journal)?.body_mut();
        let attrs = E::from_body_mut(body).ok_or_else(|| kind_mismatch::<E>(node))?;
        f(attrs);
        self.unit.journal.mark_dirty(node);
        Ok(())
    }

    // --- relationships ---

    /// Returns the relationship manager for this transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer active.
    pub fn relations(&mut self) -> CoreResult<RelationshipManager<'_>> {
        self.ensure_active()?;
        Ok(RelationshipManager::new(&mut self.graph, &mut self.unit))
    }

    /// See [`RelationshipManager::attach_reservation`].
    ///
    /// # Errors
    ///
    /// Returns `AlreadyOwned` if another user owns the reservation.
    pub fn attach_reservation<H: ReservationHolder>(
        &mut self,
        holder: Handle<H>,
        reservation: Handle<Reservation>,
    ) -> CoreResult<()> {
        self.relations()?.attach_reservation(holder, reservation)
    }

    /// See [`RelationshipManager::detach_reservation`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the holder has been removed while still
    /// holding the reservation.
    pub fn detach_reservation<H: ReservationHolder>(
        &mut self,
        holder: Handle<H>,
        reservation: Handle<Reservation>,
    ) -> CoreResult<()> {
        self.relations()?.detach_reservation(holder, reservation)
    }

    /// See [`RelationshipManager::attach_equipment`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if either entity has been removed.
    pub fn attach_equipment(
        &mut self,
        room: Handle<Room>,
        equipment: Handle<Equipment>,
    ) -> CoreResult<()> {
        self.relations()?.attach_equipment(room, equipment)
    }

    /// See [`RelationshipManager::detach_equipment`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if either entity has been removed.
    pub fn detach_equipment(
        &mut self,
        room: Handle<Room>,
        equipment: Handle<Equipment>,
    ) -> CoreResult<()> {
        self.relations()?.detach_equipment(room, equipment)
    }

    // --- traversal ---

    /// Borrows an entity's attributes.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn get<E: Entity>(&self, handle: Handle<E>) -> CoreResult<&E> {
        let node = handle.node_id();
        E::from_body(self.graph.node(node)?.body()).ok_or_else(|| kind_mismatch::<E>(node))
    }

    /// Returns an entity's identity, `None` while transient.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn id_of<E: Entity>(&self, handle: Handle<E>) -> CoreResult<Option<EntityId>> {
        Ok(self.graph.node(handle.node_id())?.id())
    }

    /// Returns an entity's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn state_of<E: Entity>(&self, handle: Handle<E>) -> CoreResult<LifecycleState> {
        Ok(self.graph.node(handle.node_id())?.state())
    }

    /// Returns a user's or room's reservations in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn reservations_of<H: ReservationHolder>(
        &self,
        holder: Handle<H>,
    ) -> CoreResult<Vec<Handle<Reservation>>> {
        let node = self.graph.node(holder.node_id())?;
        Ok(node.reservations().iter().copied().map(Handle::new).collect())
    }

    /// Returns a reservation's owner.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn owner_of(&self, reservation: Handle<Reservation>) -> CoreResult<Option<Handle<User>>> {
        self.back_ref(reservation, HolderSide::Owner)
    }

    /// Returns a reservation's room.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn room_of(&self, reservation: Handle<Reservation>) -> CoreResult<Option<Handle<Room>>> {
        self.back_ref(reservation, HolderSide::Room)
    }

    /// Returns the equipment installed in a room.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn equipment_of(&self, room: Handle<Room>) -> CoreResult<Vec<Handle<Equipment>>> {
        Ok(self.members(room.node_id())?.map(Handle::new).collect())
    }

    /// Returns the rooms an equipment is installed in.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn rooms_of(&self, equipment: Handle<Equipment>) -> CoreResult<Vec<Handle<Room>>> {
        Ok(self.members(equipment.node_id())?.map(Handle::new).collect())
    }

    fn back_ref<H: ReservationHolder>(
        &self,
        reservation: Handle<Reservation>,
        side: HolderSide,
    ) -> CoreResult<Option<Handle<H>>> {
        let node = self.graph.node(reservation.node_id())?;
        Ok(node.back_ref(side).map(Handle::new))
    }

    fn members(&self, node: NodeId) -> CoreResult<impl Iterator<Item = NodeId> + '_> {
        let node = self.graph.node(node)?;
        Ok(node.members().into_iter().flatten().copied())
    }

    // --- identity map and loading ---

    /// Finds an entity in the graph only.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the graph does not hold the entity, or holds it
    /// as removed.
    pub fn lookup<E: Entity>(&self, id: EntityId) -> CoreResult<Handle<E>> {
        self.graph.lookup(E::KIND, id).map(Handle::new)
    }

    /// Finds an entity by identity, loading it from the store on a graph
    /// miss.
    ///
    /// A store hit loads the connected subgraph as managed entities.
    ///
    /// # Errors
    ///
    /// Returns `StoreFailure` if the store cannot be read.
    pub fn find<E: Entity>(&mut self, id: EntityId) -> CoreResult<Option<Handle<E>>> {
        self.ensure_active()?;
        let node = loader::load(
            self.session.store(),
            &mut self.graph,
            &mut self.unit.journal,
            E::KIND,
            id,
        )?;
        Ok(node.map(Handle::new))
    }

    /// Finds an equipment by exact name through the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreFailure` if the store cannot be read.
    pub fn find_equipment_by_name(&mut self, name: &str) -> CoreResult<Option<Handle<Equipment>>> {
        self.ensure_active()?;
        match self.session.store().query_equipment_by_name(name)? {
            Some((id, _)) => self.find(id),
            None => Ok(None),
        }
    }

    /// Evicts an entity from the graph without deleting it.
    ///
    /// Partners lose their in-memory edges to it; nothing is written to the
    /// store. Evicting a user also evicts its reservations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a removed entity, `UnknownNode` for a
    /// stale handle.
    pub fn evict<E: Entity>(&mut self, handle: Handle<E>) -> CoreResult<Detached<E>> {
        self.ensure_active()?;
        let node = handle.node_id();
        ensure_live(&self.graph, node)?;
        let evicted = self.graph.evict(node, &mut self.unit.journal)?;
        let first = evicted
            .first()
            .ok_or(CoreError::UnknownNode { node })?;
        let entity = E::from_body(first.body())
            .cloned()
            .ok_or_else(|| kind_mismatch::<E>(node))?;
        debug!(kind = %E::KIND, %node, count = evicted.len(), "evicted");
        Ok(Detached::new(first.id(), entity))
    }

    /// Evicts every entity from the graph.
    ///
    /// Deletes already scheduled in this transaction still run at commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer active.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.graph.clear(&mut self.unit.journal);
        Ok(())
    }

    /// Drops removed entities from the graph.
    ///
    /// Entities whose row delete is still queued in this transaction are
    /// kept until commit. Handles to dropped entities become stale.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer active.
    pub fn purge_removed(&mut self) -> CoreResult<usize> {
        self.ensure_active()?;
        let pending = self.unit.deletes().to_vec();
        let purged = self.graph.purge_removed(&pending, &mut self.unit.journal);
        debug!(purged, "purged removed entities");
        Ok(purged)
    }

    /// Manages a detached entity again.
    ///
    /// Its associations are reloaded from the store, its attributes replace
    /// the stored ones and are written at commit.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the entity was never persisted
    /// - `DuplicateIdentity` if the graph already holds the identity; the
    ///   transaction is aborted
    /// - `NotFound` if the store no longer has the entity
    pub fn reattach<E: Entity>(&mut self, detached: Detached<E>) -> CoreResult<Handle<E>> {
        self.ensure_active()?;
        let Some(id) = detached.id() else {
            return Err(CoreError::invalid_operation(
                "a detached entity that was never persisted cannot be reattached; create it instead",
            ));
        };

        if self.graph.resolve(E::KIND, id).is_some() {
            let err = CoreError::DuplicateIdentity { kind: E::KIND, id };
            self.abort(err.to_string());
            return Err(err);
        }

        let node = loader::load(
            self.session.store(),
            &mut self.graph,
            &mut self.unit.journal,
            E::KIND,
            id,
        )?
        .ok_or(CoreError::NotFound { kind: E::KIND, id })?;

        let body = self.graph.node_mut(node, &mut self.unit.journal)?.body_mut();
        let attrs = E::from_body_mut(body).ok_or_else(|| kind_mismatch::<E>(node))?;
        *attrs = detached.into_entity();
        self.unit.journal.mark_dirty(node);
        Ok(Handle::new(node))
    }

    // --- completion ---

    /// Commits the transaction.
    ///
    /// Orphans are resolved, the graph is verified (if configured), and the
    /// cascade closure is flushed to the store. On failure every applied
    /// store call is compensated, the graph is restored and the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `StoreFailure` if the datastore fails
    /// - `InvalidState` if an invariant is violated
    /// - `TransientReference` if a row would reference an unsaved entity
    pub fn commit(mut self) -> CoreResult<CommitSummary> {
        self.ensure_active()?;
        match self.flush() {
            Ok(summary) => {
                self.state = TransactionState::Committed;
                self.unit.take_journal();
                let config = self.session.config();
                if config.clear_on_commit {
                    self.graph.clear(&mut Journal::new());
                } else if config.purge_removed_on_commit {
                    self.graph.purge_removed(&[], &mut Journal::new());
                }
                info!(%summary, "committed");
                Ok(summary)
            }
            Err(err) => {
                self.abort(err.to_string());
                Err(err)
            }
        }
    }

    /// Rolls the transaction back, restoring the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is no longer active.
    pub fn rollback(mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.abort("rolled back".into());
        Ok(())
    }

    fn flush(&mut self) -> CoreResult<CommitSummary> {
        let session = self.session;
        let policy = &session.config().policy;

        let orphans = cascade::resolve_orphans(&mut self.graph, &mut self.unit, policy)?;
        if orphans > 0 {
            debug!(txid = %self.unit.txid(), orphans, "removed orphans");
        }
        if session.config().verify_on_commit {
            self.graph.verify()?;
        }

        let plan = cascade::plan(&self.graph, &self.unit, policy)?;
        if plan.is_empty() {
            return Ok(CommitSummary::new(self.unit.txid()));
        }
        Executor::new(session.store(), self.unit.txid()).execute(
            &plan,
            &mut self.graph,
            &mut self.unit.journal,
        )
    }

    fn abort(&mut self, reason: String) {
        let journal = self.unit.take_journal();
        let touched = journal.touched();
        self.graph.restore(journal);
        self.state = TransactionState::Aborted;
        info!(txid = %self.unit.txid(), touched, %reason, "rolled back");
        self.abort_reason = Some(reason);
    }

    /// Ensures the transaction is active.
    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(CoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => Err(CoreError::transaction_aborted(
                self.abort_reason.as_deref().unwrap_or("aborted"),
            )),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.is_active() {
            self.abort("dropped while active".into());
        }
    }
}

fn kind_mismatch<E: Entity>(node: NodeId) -> CoreError {
    CoreError::invalid_state(format!("{node} does not hold a {}", E::KIND))
}
