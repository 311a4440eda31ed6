//! Event types and priority queue for discrete event simulation.

use std::cmp::Ordering;

use dagview::{Address, Duration, Route, RouteNotification, Timestamp};

/// Unique sequence number for deterministic event ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Scenario actions that can be scheduled during simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioAction {
    /// Install or replace a downward route.
    AddRoute(Route),
    /// Remove the downward route to a destination.
    RemoveRoute { destination: Address },
    /// Select a preferred parent (installs the default route).
    SetParent(Address),
    /// Drop the preferred parent.
    ClearParent,
    /// Change the DAG prefix used to rewrite the parent address.
    SetPrefix(Option<Address>),
    /// Start periodic traffic from a neighbor.
    StartTraffic { neighbor: Address, interval: Duration },
    /// Silence a neighbor.
    StopTraffic { neighbor: Address },
    /// Take a DAG snapshot for metrics.
    TakeSnapshot,
}

/// Events in the discrete event simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A packet from a neighbor reaches the node.
    ///
    /// `generation` ties the packet to one traffic session so a stopped and
    /// restarted neighbor does not run two packet chains.
    Packet { from: Address, generation: u32 },
    /// The routing engine reports a route table change.
    RouteChange {
        notification: RouteNotification,
        route: Route,
    },
    /// Wake the resource's timers. Stale generations are ignored.
    Timer { generation: u64 },
    /// An observer retrieves the resource.
    Fetch { observer: usize },
    /// Execute a scenario action.
    Scenario(ScenarioAction),
}

/// A scheduled event with timestamp and sequence number for ordering.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// When the event should occur.
    pub time: Timestamp,
    /// Sequence number for deterministic ordering of same-time events.
    pub seq: SequenceNumber,
    /// The event to process.
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time: Timestamp, seq: SequenceNumber, event: Event) -> Self {
        Self { time, seq, event }
    }
}

// Implement ordering for min-heap (BinaryHeap is max-heap, so we reverse).
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.time.as_millis().cmp(&self.time.as_millis()) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}
