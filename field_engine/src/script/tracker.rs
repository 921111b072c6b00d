use std::collections::BTreeMap;

use serde::Serialize;

use crate::host::MovementTicket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementEntry {
    InFlight(MovementTicket),
    Settled,
}

/// In-flight movements keyed by resolved object id (`PLAYER` or a local
/// id). Entries leave the table when a `waitmovement` joins them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MovementTracker {
    entries: BTreeMap<String, MovementEntry>,
}

impl MovementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, object: &str, ticket: MovementTicket) {
        let previous = self
            .entries
            .insert(object.to_string(), MovementEntry::InFlight(ticket));
        if let Some(MovementEntry::InFlight(orphaned)) = previous {
            log::warn!(
                "movement.reissue {object}: ticket {} replaced by {} before completion",
                orphaned.0,
                ticket.0
            );
        }
    }

    /// Records a movement that finished as soon as it was issued, e.g. one
    /// aimed at an object that is not on the map.
    pub fn settle_now(&mut self, object: &str) {
        self.entries.insert(object.to_string(), MovementEntry::Settled);
    }

    /// Marks the entry holding `ticket` finished. Returns false for tickets
    /// that are no longer tracked.
    pub fn finish(&mut self, ticket: MovementTicket) -> bool {
        match self
            .entries
            .values_mut()
            .find(|entry| **entry == MovementEntry::InFlight(ticket))
        {
            Some(entry) => {
                *entry = MovementEntry::Settled;
                true
            }
            None => false,
        }
    }

    /// Tries to join one object (or all of them when `object` is `None`).
    /// Returns true when nothing joined is still in flight; joined entries
    /// are removed.
    pub fn join(&mut self, object: Option<&str>) -> bool {
        match object {
            Some(object) => match self.entries.get(object) {
                Some(MovementEntry::InFlight(_)) => false,
                Some(MovementEntry::Settled) => {
                    self.entries.remove(object);
                    true
                }
                None => true,
            },
            None => {
                if self.any_in_flight() {
                    return false;
                }
                self.entries.clear();
                true
            }
        }
    }

    pub fn any_in_flight(&self) -> bool {
        self.entries
            .values()
            .any(|entry| matches!(entry, MovementEntry::InFlight(_)))
    }

    pub fn in_flight(&self) -> impl Iterator<Item = (&str, MovementTicket)> {
        self.entries.iter().filter_map(|(object, entry)| match entry {
            MovementEntry::InFlight(ticket) => Some((object.as_str(), *ticket)),
            MovementEntry::Settled => None,
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
