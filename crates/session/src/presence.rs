//! Who is in the room, as far as the controller has been told.

use std::collections::HashSet;

use tokio::time::Instant;

/// What a join, leave or resync did to occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    /// The room went from empty to occupied.
    BecameOccupied,
    /// The last occupant left.
    BecameEmpty,
    Unchanged,
}

/// Occupant identities and the time the room last went empty.
///
/// Joins and leaves are idempotent per identity: a repeated join, or a
/// leave for someone not recorded, is `Unchanged`.
#[derive(Debug, Default)]
pub struct RoomPresence {
    occupants: HashSet<String>,
    last_departure: Option<Instant>,
}

impl RoomPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.occupants.contains(identity)
    }

    /// Set when the room empties, cleared when it fills again.
    pub fn last_departure(&self) -> Option<Instant> {
        self.last_departure
    }

    pub fn join(&mut self, identity: &str) -> PresenceChange {
        let was_empty = self.is_empty();
        if !self.occupants.insert(identity.to_string()) {
            tracing::debug!(identity, "Join for an occupant already present");
            return PresenceChange::Unchanged;
        }
        if was_empty {
            self.last_departure = None;
            PresenceChange::BecameOccupied
        } else {
            PresenceChange::Unchanged
        }
    }

    pub fn leave(&mut self, identity: &str, now: Instant) -> PresenceChange {
        if !self.occupants.remove(identity) {
            tracing::warn!(identity, "Leave for an occupant not recorded, ignoring");
            return PresenceChange::Unchanged;
        }
        if self.is_empty() {
            self.last_departure = Some(now);
            PresenceChange::BecameEmpty
        } else {
            PresenceChange::Unchanged
        }
    }

    /// Replace the recorded occupants with a listing from the room.
    pub fn sync<I, S>(&mut self, identities: I, now: Instant) -> PresenceChange
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let was_empty = self.is_empty();
        self.occupants = identities.into_iter().map(Into::into).collect();
        match (was_empty, self.is_empty()) {
            (true, false) => {
                self.last_departure = None;
                PresenceChange::BecameOccupied
            }
            (false, true) => {
                self.last_departure = Some(now);
                PresenceChange::BecameEmpty
            }
            _ => PresenceChange::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_tracks_distinct_occupants() {
        let now = Instant::now();
        let mut presence = RoomPresence::new();
        assert_eq!(presence.join("alice"), PresenceChange::BecameOccupied);
        assert_eq!(presence.join("bob"), PresenceChange::Unchanged);
        assert_eq!(presence.leave("alice", now), PresenceChange::Unchanged);
        assert_eq!(presence.occupant_count(), 1);
        assert_eq!(presence.leave("bob", now), PresenceChange::BecameEmpty);
        assert!(presence.is_empty());
    }

    #[test]
    fn repeated_join_counts_once() {
        let now = Instant::now();
        let mut presence = RoomPresence::new();
        presence.join("alice");
        assert_eq!(presence.join("alice"), PresenceChange::Unchanged);
        assert_eq!(presence.occupant_count(), 1);
        assert_eq!(presence.leave("alice", now), PresenceChange::BecameEmpty);
    }

    #[test]
    fn leave_of_unknown_identity_is_ignored() {
        let now = Instant::now();
        let mut presence = RoomPresence::new();
        assert_eq!(presence.leave("ghost", now), PresenceChange::Unchanged);
        assert_eq!(presence.last_departure(), None);

        presence.join("alice");
        assert_eq!(presence.leave("ghost", now), PresenceChange::Unchanged);
        assert!(presence.contains("alice"));
    }

    #[test]
    fn departure_timestamp_set_and_cleared() {
        let now = Instant::now();
        let mut presence = RoomPresence::new();
        presence.join("alice");
        presence.leave("alice", now);
        assert_eq!(presence.last_departure(), Some(now));
        presence.join("alice");
        assert_eq!(presence.last_departure(), None);
    }

    #[test]
    fn sync_reports_transitions() {
        let now = Instant::now();
        let mut presence = RoomPresence::new();
        assert_eq!(presence.sync(["alice", "bob"], now), PresenceChange::BecameOccupied);
        assert_eq!(presence.sync(["bob"], now), PresenceChange::Unchanged);
        assert!(!presence.contains("alice"));
        assert_eq!(presence.sync(Vec::<String>::new(), now), PresenceChange::BecameEmpty);
        assert_eq!(presence.last_departure(), Some(now));
        assert_eq!(presence.sync(Vec::<String>::new(), now), PresenceChange::Unchanged);
    }

    #[test]
    fn arbitrary_sequences_stay_consistent() {
        let now = Instant::now();
        let mut presence = RoomPresence::new();
        let mut expected: HashSet<&str> = HashSet::new();
        let steps = [
            ("alice", true),
            ("alice", true),
            ("bob", true),
            ("alice", false),
            ("alice", false),
            ("bob", false),
            ("bob", false),
            ("carol", true),
        ];
        for (identity, joining) in steps {
            if joining {
                presence.join(identity);
                expected.insert(identity);
            } else {
                presence.leave(identity, now);
                expected.remove(identity);
            }
            assert_eq!(presence.occupant_count(), expected.len());
            if !expected.is_empty() {
                assert!(presence.last_departure().is_none());
            }
        }
    }
}
