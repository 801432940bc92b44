//! Song fullness predicate and edge detection.
//!
//! A song is *full* when every role it requires has at least one occupant.
//! Mutating requests evaluate the predicate against the ledger state before
//! and after the change; only a [`FullnessEdge::Rising`] transition may lead
//! to a completion announcement.

use std::collections::BTreeSet;

/// A set of role names. Ordered so that views and logs are deterministic.
pub type RoleSet = BTreeSet<String>;

/// Returns `true` iff `required` is non-empty and every required role is in
/// `occupied`.
///
/// A song without required roles is never full.
pub fn is_full(required: &RoleSet, occupied: &RoleSet) -> bool {
    !required.is_empty() && required.is_subset(occupied)
}

/// Direction of a fullness change across a single mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullnessEdge {
    /// Not full before, full after.
    Rising,
    /// Full before, not full after. Never announced.
    Falling,
    /// No change.
    Steady,
}

impl FullnessEdge {
    /// Classify a before/after pair of fullness evaluations.
    pub fn between(full_before: bool, full_after: bool) -> Self {
        match (full_before, full_after) {
            (false, true) => FullnessEdge::Rising,
            (true, false) => FullnessEdge::Falling,
            _ => FullnessEdge::Steady,
        }
    }

    pub fn is_rising(self) -> bool {
        self == FullnessEdge::Rising
    }
}

/// Snapshot of a song's role sets around one ledger mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullnessSnapshot {
    pub required_before: RoleSet,
    pub occupied_before: RoleSet,
    pub required_after: RoleSet,
    pub occupied_after: RoleSet,
}

impl FullnessSnapshot {
    pub fn full_before(&self) -> bool {
        is_full(&self.required_before, &self.occupied_before)
    }

    pub fn full_after(&self) -> bool {
        is_full(&self.required_after, &self.occupied_after)
    }

    pub fn edge(&self) -> FullnessEdge {
        FullnessEdge::between(self.full_before(), self.full_after())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> RoleSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_required_set_is_never_full() {
        assert!(!is_full(&set(&[]), &set(&[])));
        assert!(!is_full(&set(&[]), &set(&["vocals", "guitar"])));
    }

    #[test]
    fn full_when_every_required_role_is_occupied() {
        assert!(is_full(&set(&["vocals", "guitar"]), &set(&["guitar", "vocals"])));
    }

    #[test]
    fn not_full_with_a_missing_role() {
        assert!(!is_full(&set(&["vocals", "guitar"]), &set(&["guitar"])));
    }

    #[test]
    fn occupied_roles_outside_the_required_set_are_ignored() {
        assert!(is_full(&set(&["vocals"]), &set(&["vocals", "tambourine"])));
        assert!(!is_full(&set(&["vocals", "bass"]), &set(&["vocals", "tambourine"])));
    }

    #[test]
    fn edge_classification() {
        assert_eq!(FullnessEdge::between(false, true), FullnessEdge::Rising);
        assert_eq!(FullnessEdge::between(true, false), FullnessEdge::Falling);
        assert_eq!(FullnessEdge::between(true, true), FullnessEdge::Steady);
        assert_eq!(FullnessEdge::between(false, false), FullnessEdge::Steady);
        assert!(FullnessEdge::Rising.is_rising());
        assert!(!FullnessEdge::Falling.is_rising());
    }

    #[test]
    fn snapshot_detects_rising_edge_on_last_role() {
        let snapshot = FullnessSnapshot {
            required_before: set(&["vocals", "guitar"]),
            occupied_before: set(&["guitar"]),
            required_after: set(&["vocals", "guitar"]),
            occupied_after: set(&["guitar", "vocals"]),
        };
        assert!(snapshot.edge().is_rising());
    }

    #[test]
    fn snapshot_detects_rising_edge_when_required_set_shrinks() {
        let snapshot = FullnessSnapshot {
            required_before: set(&["vocals", "guitar"]),
            occupied_before: set(&["guitar"]),
            required_after: set(&["guitar"]),
            occupied_after: set(&["guitar"]),
        };
        assert_eq!(snapshot.edge(), FullnessEdge::Rising);
    }

    #[test]
    fn second_occupant_of_a_full_song_is_steady() {
        let snapshot = FullnessSnapshot {
            required_before: set(&["vocals"]),
            occupied_before: set(&["vocals"]),
            required_after: set(&["vocals"]),
            occupied_after: set(&["vocals"]),
        };
        assert_eq!(snapshot.edge(), FullnessEdge::Steady);
    }
}
