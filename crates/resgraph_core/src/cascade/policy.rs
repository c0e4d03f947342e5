//! Cascade policy table.

use crate::error::{CoreError, CoreResult};
use resgraph_store::EntityKind;
use std::collections::BTreeMap;

/// Cascade flags for one (owner kind, dependent kind) association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeRule {
    /// Persisting the owner persists the dependents.
    pub persist: bool,
    /// Removing the owner removes the dependents.
    pub delete: bool,
    /// A dependent that loses this owner is deleted at commit.
    pub orphan_removal: bool,
}

impl CascadeRule {
    /// A rule that cascades nothing.
    pub const NONE: Self = Self {
        persist: false,
        delete: false,
        orphan_removal: false,
    };

    /// Cascade persist only.
    pub const PERSIST: Self = Self {
        persist: true,
        delete: false,
        orphan_removal: false,
    };

    /// Cascade persist and delete, with orphan removal.
    pub const ALL: Self = Self {
        persist: true,
        delete: true,
        orphan_removal: true,
    };
}

/// Maps each (owner kind, dependent kind) association to its [`CascadeRule`].
///
/// Associations missing from the table cascade nothing. The default table
/// makes reservations owned aggregates of their user, and keeps equipment
/// independent of every room it is installed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePolicy {
    rules: BTreeMap<(EntityKind, EntityKind), CascadeRule>,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self::empty()
            .with_rule(EntityKind::User, EntityKind::Reservation, CascadeRule::ALL)
            .with_rule(EntityKind::Room, EntityKind::Reservation, CascadeRule::PERSIST)
            .with_rule(EntityKind::Room, EntityKind::Equipment, CascadeRule::PERSIST)
    }
}

impl CascadePolicy {
    /// Creates a table with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Sets the rule for an association.
    #[must_use]
    pub fn with_rule(mut self, owner: EntityKind, dependent: EntityKind, rule: CascadeRule) -> Self {
        self.rules.insert((owner, dependent), rule);
        self
    }

    /// Returns the rule for an association, [`CascadeRule::NONE`] if unset.
    #[must_use]
    pub fn rule(&self, owner: EntityKind, dependent: EntityKind) -> CascadeRule {
        self.rules
            .get(&(owner, dependent))
            .copied()
            .unwrap_or(CascadeRule::NONE)
    }

    /// Iterates over the configured rules.
    pub fn rules(&self) -> impl Iterator<Item = ((EntityKind, EntityKind), CascadeRule)> + '_ {
        self.rules.iter().map(|(key, rule)| (*key, *rule))
    }

    /// Rejects tables the graph cannot honour.
    ///
    /// Only user → reservation, room → reservation and room → equipment
    /// are associations. Equipment is never deleted through a room, and
    /// only a reservation's owner can orphan it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` naming the offending association.
    pub fn validate(&self) -> CoreResult<()> {
        for ((owner, dependent), rule) in self.rules() {
            let known = matches!(
                (owner, dependent),
                (EntityKind::User, EntityKind::Reservation)
                    | (EntityKind::Room, EntityKind::Reservation)
                    | (EntityKind::Room, EntityKind::Equipment)
            );
            if !known {
                return Err(CoreError::invalid_operation(format!(
                    "no association from {owner} to {dependent}"
                )));
            }
            if owner == EntityKind::Room && dependent == EntityKind::Equipment && rule.delete {
                return Err(CoreError::invalid_operation(
                    "equipment lifetime is independent of rooms; room -> equipment cannot cascade delete",
                ));
            }
            if owner == EntityKind::Room && rule.orphan_removal {
                return Err(CoreError::invalid_operation(format!(
                    "orphan removal is only defined for owned reservations, not room -> {dependent}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let policy = CascadePolicy::default();
        assert_eq!(
            policy.rule(EntityKind::User, EntityKind::Reservation),
            CascadeRule::ALL
        );
        assert_eq!(
            policy.rule(EntityKind::Room, EntityKind::Reservation),
            CascadeRule::PERSIST
        );
        assert!(!policy.rule(EntityKind::Room, EntityKind::Equipment).delete);
        policy.validate().unwrap();
    }

    #[test]
    fn missing_rule_cascades_nothing() {
        let policy = CascadePolicy::empty();
        assert_eq!(
            policy.rule(EntityKind::User, EntityKind::Reservation),
            CascadeRule::NONE
        );
    }

    #[test]
    fn equipment_delete_is_rejected() {
        let policy = CascadePolicy::default().with_rule(
            EntityKind::Room,
            EntityKind::Equipment,
            CascadeRule {
                persist: true,
                delete: true,
                orphan_removal: false,
            },
        );
        assert!(matches!(
            policy.validate(),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn room_orphan_removal_is_rejected() {
        let policy = CascadePolicy::default().with_rule(
            EntityKind::Room,
            EntityKind::Reservation,
            CascadeRule::ALL,
        );
        assert!(policy.validate().is_err());
    }

    #[test]
    fn unknown_association_is_rejected() {
        let policy = CascadePolicy::empty().with_rule(
            EntityKind::Equipment,
            EntityKind::User,
            CascadeRule::PERSIST,
        );
        assert!(policy.validate().is_err());
    }
}
