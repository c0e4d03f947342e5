//! Typed node handles and detached entities.

use crate::entity::Entity;
use crate::types::{LifecycleState, NodeId};
use resgraph_store::EntityId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A typed, copyable reference to an entity node in the graph.
///
/// Handles never own the entity; every read goes through the transaction
/// that holds the graph. A handle outlives eviction but resolves to
/// [`crate::CoreError::UnknownNode`] afterwards.
pub struct Handle<E> {
    node: NodeId,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Handle<E> {
    pub(crate) const fn new(node: NodeId) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    /// Returns the graph node this handle refers to.
    #[must_use]
    pub const fn node_id(self) -> NodeId {
        self.node
    }
}

impl<E> Clone for Handle<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Handle<E> {}

impl<E> PartialEq for Handle<E> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<E> Eq for Handle<E> {}

impl<E> Hash for Handle<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

impl<E: Entity> fmt::Debug for Handle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({})", E::KIND, self.node)
    }
}

/// An entity evicted from the graph without being deleted.
///
/// It keeps its identity (if it had one) but no associations. Pass it to
/// [`crate::Transaction::reattach`] to manage it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached<E> {
    id: Option<EntityId>,
    entity: E,
}

impl<E> Detached<E> {
    pub(crate) fn new(id: Option<EntityId>, entity: E) -> Self {
        Self { id, entity }
    }

    /// Returns the retained identity, `None` if the entity was never persisted.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Returns the lifecycle state, always [`LifecycleState::Detached`].
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        LifecycleState::Detached
    }

    /// Borrows the attributes.
    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// Mutably borrows the attributes.
    pub fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    /// Consumes the wrapper, returning the attributes.
    pub fn into_entity(self) -> E {
        self.entity
    }
}
