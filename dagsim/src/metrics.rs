//! Metrics collection for simulation analysis.

use dagview::{Address, Route, Timestamp};

/// The resource's state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagSnapshot {
    /// When this snapshot was taken.
    pub time: Timestamp,
    /// Preferred parent as known to the routing engine.
    pub parent: Option<Address>,
    /// Full route table, including routes hidden from the body.
    pub routes: Vec<Route>,
    /// Neighbors currently in the reachability table.
    pub tracked: Vec<Address>,
    /// Destinations the body would list as children.
    pub visible_children: Vec<Address>,
    /// Deadline of an armed notification, if any.
    pub pending_notification: Option<Timestamp>,
}

impl DagSnapshot {
    /// Routes hidden because their next hop has gone quiet.
    pub fn hidden_routes(&self) -> usize {
        self.routes.len() - self.visible_children.len()
    }

    pub fn is_visible(&self, destination: &Address) -> bool {
        self.visible_children.contains(destination)
    }
}

/// Simulation metrics collected over time.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// Neighbor packets delivered to the resource.
    pub packets_observed: u64,
    /// Neighbor packets lost before delivery.
    pub packets_dropped: u64,
    /// Route table changes reported to the resource.
    pub route_changes: u64,
    /// Subscriber notifications raised by the resource.
    pub notifications: u64,
    /// Completed observer retrievals.
    pub fetches: u64,
    /// GET exchanges across all retrievals.
    pub exchanges: u64,
    /// Body bytes served across all retrievals.
    pub bytes_served: u64,
    /// Failed retrievals.
    pub fetch_errors: u64,
    /// DAG snapshots taken at intervals or on request.
    pub snapshots: Vec<DagSnapshot>,
}

impl SimMetrics {
    /// Create new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot.
    pub fn add_snapshot(&mut self, snapshot: DagSnapshot) {
        self.snapshots.push(snapshot);
    }

    /// Get the latest snapshot.
    pub fn latest_snapshot(&self) -> Option<&DagSnapshot> {
        self.snapshots.last()
    }

    /// First snapshot at or after `time`.
    pub fn snapshot_at(&self, time: Timestamp) -> Option<&DagSnapshot> {
        self.snapshots.iter().find(|s| s.time >= time)
    }

    /// First time a destination stopped being listed, after having been listed.
    pub fn hidden_since(&self, destination: &Address) -> Option<Timestamp> {
        let first_seen = self.snapshots.iter().position(|s| s.is_visible(destination))?;
        self.snapshots[first_seen..]
            .iter()
            .find(|s| !s.is_visible(destination))
            .map(|s| s.time)
    }

    /// Mean exchanges per completed retrieval.
    pub fn exchanges_per_fetch(&self) -> f64 {
        if self.fetches == 0 {
            return 0.0;
        }
        self.exchanges as f64 / self.fetches as f64
    }
}

/// Result of running a simulation.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Final simulation time.
    pub end_time: Timestamp,
    /// Collected metrics.
    pub metrics: SimMetrics,
    /// Whether simulation ended due to event queue exhaustion (vs time limit).
    pub queue_exhausted: bool,
}

impl SimulationResult {
    /// Children listed in the final snapshot.
    pub fn final_children(&self) -> Vec<Address> {
        self.metrics
            .latest_snapshot()
            .map(|s| s.visible_children.clone())
            .unwrap_or_default()
    }

    pub fn final_parent(&self) -> Option<Address> {
        self.metrics.latest_snapshot().and_then(|s| s.parent)
    }
}
