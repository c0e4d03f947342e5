//! Commit summaries.

use crate::types::TransactionId;
use std::fmt;

/// What a successful commit wrote to the datastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// The committed transaction.
    pub txid: TransactionId,
    /// Rows inserted.
    pub inserted: usize,
    /// Existing rows rewritten.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: usize,
    /// Join rows written.
    pub joins_written: usize,
    /// Join rows deleted.
    pub joins_deleted: usize,
}

impl CommitSummary {
    pub(crate) fn new(txid: TransactionId) -> Self {
        Self {
            txid,
            inserted: 0,
            updated: 0,
            deleted: 0,
            joins_written: 0,
            joins_deleted: 0,
        }
    }

    /// Returns `true` if the commit issued no writes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted + self.updated + self.deleted + self.joins_written + self.joins_deleted == 0
    }
}

impl fmt::Display for CommitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} inserted, {} updated, {} deleted, {}/{} joins written/deleted",
            self.txid,
            self.inserted,
            self.updated,
            self.deleted,
            self.joins_written,
            self.joins_deleted
        )
    }
}
