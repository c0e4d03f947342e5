//! Error types for datastore operations.

use crate::kind::EntityKind;
use thiserror::Error;

/// Result type for datastore operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during datastore operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A row payload could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// A row was written or read under the wrong entity kind.
    #[error("kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        /// The kind the caller addressed.
        expected: EntityKind,
        /// The kind of the row actually supplied or stored.
        actual: EntityKind,
    },

    /// The datastore could not complete the operation.
    #[error("datastore unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
