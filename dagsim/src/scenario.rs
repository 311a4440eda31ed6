//! Scenario builder for setting up and running simulations.

use dagview::{Address, Duration, ResourceConfig, Route, Timestamp};

use crate::event::ScenarioAction;
use crate::metrics::SimulationResult;
use crate::sim::{Simulator, DEFAULT_FETCH_DELAY};

/// Builder for simulation scenarios.
///
/// Neighbors, routes and the parent given without a time are set up at
/// time zero through the same scenario actions as the timed ones, so initial
/// routes arm the notification timer like any later change.
pub struct ScenarioBuilder {
    /// RNG seed for determinism.
    seed: u64,
    /// Neighbor packet loss rate.
    loss_rate: f64,
    /// Delay between notification and retrieval.
    fetch_delay: Duration,
    /// Initial DAG prefix.
    prefix: Option<Address>,
    /// Block size of each observer, in registration order.
    observers: Vec<usize>,
    /// Scheduled actions.
    actions: Vec<(Timestamp, ScenarioAction)>,
    /// Snapshot interval.
    snapshot_interval: Option<Duration>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            seed: 42,
            loss_rate: 0.0,
            fetch_delay: DEFAULT_FETCH_DELAY,
            prefix: None,
            observers: Vec::new(),
            actions: Vec::new(),
            snapshot_interval: None,
        }
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set neighbor packet loss rate.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set the delay between a notification and the observers' retrieval.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Set snapshot interval for metrics collection.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    /// Set the DAG prefix from the start.
    pub fn prefix(mut self, prefix: Address) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Register an observer retrieving with `block_size` byte blocks.
    pub fn observer(mut self, block_size: usize) -> Self {
        self.observers.push(block_size);
        self
    }

    /// Neighbor sending a packet every `interval` from time zero.
    pub fn neighbor(self, neighbor: Address, interval: Duration) -> Self {
        self.start_traffic_at(Timestamp::ZERO, neighbor, interval)
    }

    /// Route installed at time zero.
    pub fn route(self, destination: Address, next_hop: Address) -> Self {
        self.add_route_at(Timestamp::ZERO, destination, next_hop)
    }

    /// Preferred parent selected at time zero.
    pub fn parent(self, parent: Address) -> Self {
        self.set_parent_at(Timestamp::ZERO, parent)
    }

    /// Schedule an arbitrary action.
    pub fn action_at(mut self, time: Timestamp, action: ScenarioAction) -> Self {
        self.actions.push((time, action));
        self
    }

    pub fn add_route_at(self, time: Timestamp, destination: Address, next_hop: Address) -> Self {
        self.action_at(
            time,
            ScenarioAction::AddRoute(Route::new(destination, next_hop)),
        )
    }

    pub fn remove_route_at(self, time: Timestamp, destination: Address) -> Self {
        self.action_at(time, ScenarioAction::RemoveRoute { destination })
    }

    pub fn set_parent_at(self, time: Timestamp, parent: Address) -> Self {
        self.action_at(time, ScenarioAction::SetParent(parent))
    }

    pub fn clear_parent_at(self, time: Timestamp) -> Self {
        self.action_at(time, ScenarioAction::ClearParent)
    }

    pub fn start_traffic_at(self, time: Timestamp, neighbor: Address, interval: Duration) -> Self {
        self.action_at(time, ScenarioAction::StartTraffic { neighbor, interval })
    }

    pub fn stop_traffic_at(self, time: Timestamp, neighbor: Address) -> Self {
        self.action_at(time, ScenarioAction::StopTraffic { neighbor })
    }

    /// Schedule a snapshot at the specified time.
    pub fn snapshot_at(self, time: Timestamp) -> Self {
        self.action_at(time, ScenarioAction::TakeSnapshot)
    }

    /// Build a simulator using the default resource configuration.
    pub fn build(self) -> Simulator {
        let sim = Simulator::new(self.seed);
        self.configure(sim)
    }

    /// Build a simulator whose resource uses config `C`.
    pub fn build_with_config<C: ResourceConfig>(self) -> Simulator<C> {
        let sim = Simulator::with_config(self.seed);
        self.configure(sim)
    }

    fn configure<C: ResourceConfig>(self, sim: Simulator<C>) -> Simulator<C> {
        let mut sim = sim
            .with_loss_rate(self.loss_rate)
            .with_fetch_delay(self.fetch_delay);

        // Set snapshot interval if specified
        if let Some(interval) = self.snapshot_interval {
            sim = sim.with_snapshot_interval(interval);
        }

        if self.prefix.is_some() {
            sim.schedule_action(Timestamp::ZERO, ScenarioAction::SetPrefix(self.prefix));
        }

        for block_size in self.observers {
            sim.add_observer(block_size);
        }

        for (time, action) in self.actions {
            sim.schedule_action(time, action);
        }

        sim
    }

    /// Build and run the simulation for the specified duration.
    pub fn run_for(self, duration: Duration) -> SimulationResult {
        self.build().run_for(duration)
    }

    /// Build and run until the specified time.
    pub fn run_until(self, time: Timestamp) -> SimulationResult {
        self.build().run_until(time)
    }
}

/// Address of the `n`th simulated neighbor (link-local).
pub fn neighbor_address(n: u16) -> Address {
    Address::from_segments([0xfe80, 0, 0, 0, 0x0212, 0x7400, n, n])
}

/// Address of the `n`th downstream destination.
pub fn child_address(n: u16) -> Address {
    Address::from_segments([0xaaaa, 0, 0, 0, 0x0212, 0x7400, n, n])
}

/// Global DAG prefix used by [`router_scenario`].
pub const DAG_PREFIX: Address = Address::from_segments([0xaaaa, 0, 0, 0, 0, 0, 0, 0]);

/// A router with a parent (neighbor 0) and `children` one-hop children
/// (neighbors 1..=children), all sending traffic every 10 seconds.
pub fn router_scenario(children: u16) -> ScenarioBuilder {
    let mut builder = ScenarioBuilder::new()
        .prefix(DAG_PREFIX)
        .parent(neighbor_address(0))
        .neighbor(neighbor_address(0), Duration::from_secs(10));

    for n in 1..=children {
        builder = builder
            .neighbor(neighbor_address(n), Duration::from_secs(10))
            .route(child_address(n), neighbor_address(n));
    }
    builder
}

#[cfg(test)]
mod tests {
    use dagview::SmallConfig;

    use super::*;

    #[test]
    fn test_scenario_builder_basic() {
        let sim = ScenarioBuilder::new()
            .with_seed(123)
            .observer(32)
            .observer(64)
            .build();

        assert_eq!(sim.observers().len(), 2);
        assert_eq!(sim.observer(1).map(|o| o.block_size()), Some(64));
    }

    #[test]
    fn test_scenario_run_for() {
        let result = router_scenario(2).run_for(Duration::from_secs(1));

        assert!(result.end_time >= Timestamp::from_secs(1));
        assert!(!result.metrics.snapshots.is_empty());
        assert_eq!(result.final_parent(), Some(neighbor_address(0)));
        assert_eq!(
            result.final_children(),
            vec![child_address(1), child_address(2)]
        );
    }

    #[test]
    fn test_build_with_config() {
        let mut sim = router_scenario(6).build_with_config::<SmallConfig>();
        sim.run_for(Duration::from_secs(1));

        // Parent plus three children fill the four slots.
        assert_eq!(sim.resource().tracked_neighbors().len(), 4);
        let snapshot = sim.metrics().latest_snapshot().cloned();
        assert_eq!(snapshot.map(|s| s.visible_children.len()), Some(3));
    }

    #[test]
    fn test_timed_actions() {
        let result = router_scenario(1)
            .remove_route_at(Timestamp::from_secs(5), child_address(1))
            .clear_parent_at(Timestamp::from_secs(5))
            .run_for(Duration::from_secs(6));

        assert_eq!(result.final_parent(), None);
        assert!(result.final_children().is_empty());
    }
}
