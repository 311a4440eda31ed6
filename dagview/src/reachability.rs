//! Traffic-driven neighbor liveness table.
//!
//! The routing engine can keep routes through neighbors whose link went
//! quiet without any removal event. This table records when traffic was last
//! heard from each neighbor and is used purely to filter what the resource
//! shows; it never touches routing state.
//!
//! The table has a fixed number of slots chosen at construction. Slots are
//! found by linear scan: capacities are small (the routing stack's route
//! count) and a scan keeps the memory footprint exact.

use alloc::vec;
use alloc::vec::Vec;

use crate::time::{Duration, Timestamp};
use crate::types::Address;

/// One slot of the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slot {
    address: Address,
    /// `None` marks a free slot.
    last_seen: Option<Timestamp>,
}

impl Slot {
    const FREE: Slot = Slot {
        address: Address::UNSPECIFIED,
        last_seen: None,
    };
}

/// What [`ReachabilityTable::observe`] did with an observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// The address was already tracked; its timestamp was refreshed.
    Refreshed,
    /// The address claimed a free slot.
    Inserted,
    /// The table is full; the address is not tracked.
    Dropped,
}

/// A live entry, as reported by [`ReachabilityTable::iter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReachabilityEntry {
    pub address: Address,
    pub last_seen: Timestamp,
}

/// Fixed-capacity table of recently heard neighbors.
#[derive(Clone, Debug)]
pub struct ReachabilityTable {
    slots: Vec<Slot>,
}

impl ReachabilityTable {
    /// Create a table with `capacity` free slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::FREE; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.last_seen.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.last_seen.is_some())
    }

    /// Record traffic from `address` at `now`.
    ///
    /// Refreshes an existing entry, otherwise claims the first free slot.
    /// A full table ignores new addresses; nothing is evicted to make room.
    pub fn observe(&mut self, address: Address, now: Timestamp) -> Observation {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.last_seen.is_some() && s.address == address)
        {
            slot.last_seen = Some(now);
            return Observation::Refreshed;
        }

        match self.slots.iter_mut().find(|s| s.last_seen.is_none()) {
            Some(slot) => {
                *slot = Slot {
                    address,
                    last_seen: Some(now),
                };
                Observation::Inserted
            }
            None => Observation::Dropped,
        }
    }

    /// Free the first entry silent for longer than `threshold`.
    ///
    /// Evicts at most one entry per call, so a burst of stale neighbors is
    /// drained over several sweep periods. Returns the evicted entry.
    pub fn sweep(&mut self, now: Timestamp, threshold: Duration) -> Option<ReachabilityEntry> {
        let slot = self.slots.iter_mut().find(|s| match s.last_seen {
            Some(seen) => now.saturating_since(seen) > threshold,
            None => false,
        })?;
        let evicted = ReachabilityEntry {
            address: slot.address,
            last_seen: slot.last_seen?,
        };
        *slot = Slot::FREE;
        Some(evicted)
    }

    /// Whether a route through `next_hop` should be shown.
    pub fn contains_as_nexthop(&self, next_hop: &Address) -> bool {
        self.last_seen(next_hop).is_some()
    }

    /// When traffic from `address` was last recorded, if it is tracked.
    pub fn last_seen(&self, address: &Address) -> Option<Timestamp> {
        self.slots
            .iter()
            .find(|s| s.last_seen.is_some() && s.address == *address)
            .and_then(|s| s.last_seen)
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = ReachabilityEntry> + '_ {
        self.slots.iter().filter_map(|s| {
            s.last_seen.map(|last_seen| ReachabilityEntry {
                address: s.address,
                last_seen,
            })
        })
    }
}
