//! Error types for resgraph core.

use crate::types::NodeId;
use resgraph_store::{EntityId, EntityKind, StoreError};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in resgraph core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No entity with this identity is known to the graph or the store.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind that was searched.
        kind: EntityKind,
        /// Identity that was not found.
        id: EntityId,
    },

    /// A reservation already belongs to a different holder.
    #[error("reservation {reservation} is already held by {holder_kind} {holder}")]
    AlreadyOwned {
        /// The reservation being attached.
        reservation: NodeId,
        /// Kind of the current holder.
        holder_kind: EntityKind,
        /// The current holder.
        holder: NodeId,
    },

    /// The graph already holds a different node with this identity.
    #[error("duplicate identity: {kind} {id} is already in the graph")]
    DuplicateIdentity {
        /// Kind of the entity.
        kind: EntityKind,
        /// The clashing identity.
        id: EntityId,
    },

    /// The datastore failed; the enclosing transaction is rolled back.
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),

    /// A row would be written with a foreign key to an unsaved entity.
    #[error("{from} references transient {to} {node} that is not being persisted")]
    TransientReference {
        /// Kind of the entity being written.
        from: EntityKind,
        /// Kind of the referenced entity.
        to: EntityKind,
        /// The referenced node.
        node: NodeId,
    },

    /// The handle points at a node that is no longer in the graph.
    #[error("{node} is not in the graph")]
    UnknownNode {
        /// The missing node.
        node: NodeId,
    },

    /// The entity's lifecycle state does not permit the operation.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the violated state.
        message: String,
    },

    /// Transaction was aborted.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised by the datastore.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreFailure(_))
    }
}
