//! Session configuration.

use crate::cascade::CascadePolicy;

/// Configuration for opening a session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cascade rules per (owner kind, dependent kind).
    pub policy: CascadePolicy,

    /// Whether to check graph invariants before any store call at commit.
    pub verify_on_commit: bool,

    /// Whether to evict the whole graph after each successful commit.
    pub clear_on_commit: bool,

    /// Whether to drop removed entities from the graph after each
    /// successful commit.
    pub purge_removed_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: CascadePolicy::default(),
            verify_on_commit: true,
            clear_on_commit: false,
            purge_removed_on_commit: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cascade policy.
    #[must_use]
    pub fn policy(mut self, policy: CascadePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets whether to verify graph invariants on commit.
    #[must_use]
    pub fn verify_on_commit(mut self, value: bool) -> Self {
        self.verify_on_commit = value;
        self
    }

    /// Sets whether to clear the graph after each commit.
    #[must_use]
    pub fn clear_on_commit(mut self, value: bool) -> Self {
        self.clear_on_commit = value;
        self
    }

    /// Sets whether to drop removed entities after each commit.
    #[must_use]
    pub fn purge_removed_on_commit(mut self, value: bool) -> Self {
        self.purge_removed_on_commit = value;
        self
    }
}
