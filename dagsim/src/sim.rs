//! Discrete event simulator hosting one dagview resource.

use std::collections::BinaryHeap;

use dagview::{
    Address, DefaultConfig, Duration, ResourceConfig, Route, RouteNotification, RoutingEngine,
    Timestamp, TopologyEvent,
};
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::event::{Event, ScenarioAction, ScheduledEvent, SequenceNumber};
use crate::host::{SimClock, SimNotifier, SimResource, SimRouting};
use crate::metrics::{DagSnapshot, SimMetrics, SimulationResult};
use crate::observer::Observer;
use crate::trace::TracingEmitter;

/// Delay between a notification and the observers' retrieval.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(100);

/// Traffic state of a simulated neighbor.
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    interval: Duration,
    alive: bool,
    /// Bumped on every restart; packets of older sessions are discarded.
    generation: u32,
}

/// Discrete event simulator for a node publishing its DoDAG view.
pub struct Simulator<C: ResourceConfig = DefaultConfig> {
    /// The resource under test.
    resource: SimResource<C>,
    /// Routing engine state of the hosting node.
    routing: SimRouting,
    /// Neighbors sending traffic to the node.
    neighbors: HashMap<Address, Neighbor>,
    /// Clients retrieving the resource after each notification.
    observers: Vec<Observer>,
    /// Current simulation time.
    current_time: Timestamp,
    /// Priority queue of scheduled events.
    event_queue: BinaryHeap<ScheduledEvent>,
    /// Collected metrics.
    metrics: SimMetrics,
    /// Next sequence number for event ordering.
    next_seq: u64,
    /// Generation of the live timer chain.
    timer_generation: u64,
    /// Wake-up time of the live timer chain.
    scheduled_wake: Option<Timestamp>,
    /// RNG state for packet loss.
    rng_state: u64,
    /// Probability that a neighbor packet is lost.
    loss_rate: f64,
    /// Delay between notification and retrieval.
    fetch_delay: Duration,
    /// Interval for automatic snapshots.
    snapshot_interval: Option<Duration>,
    /// Next snapshot time.
    next_snapshot: Option<Timestamp>,
}

impl Simulator {
    /// Create a new simulator with given RNG seed and the default config.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed)
    }
}

impl<C: ResourceConfig> Simulator<C> {
    /// Create a new simulator whose resource uses config `C`.
    pub fn with_config(seed: u64) -> Self {
        let resource = SimResource::<C>::new(SimClock::new(), SimNotifier::new());
        resource.set_debug_emitter(Box::new(TracingEmitter));

        let mut sim = Self {
            resource,
            routing: SimRouting::new(),
            neighbors: HashMap::new(),
            observers: Vec::new(),
            current_time: Timestamp::ZERO,
            event_queue: BinaryHeap::new(),
            metrics: SimMetrics::new(),
            next_seq: 0,
            timer_generation: 0,
            scheduled_wake: None,
            rng_state: seed,
            loss_rate: 0.0,
            fetch_delay: DEFAULT_FETCH_DELAY,
            snapshot_interval: None,
            next_snapshot: None,
        };
        sim.reschedule_timer();
        sim
    }

    /// Set the snapshot interval for automatic DAG state recording.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self.next_snapshot = Some(self.current_time + interval);
        self
    }

    /// Set the neighbor packet loss rate, clamped to `[0, 1]`.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set the delay between a notification and the observers' retrieval.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Register an observer; returns its index.
    pub fn add_observer(&mut self, block_size: usize) -> usize {
        self.observers.push(Observer::new(block_size));
        self.observers.len() - 1
    }

    pub fn observer(&self, index: usize) -> Option<&Observer> {
        self.observers.get(index)
    }

    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    pub fn resource(&self) -> &SimResource<C> {
        &self.resource
    }

    pub fn routing(&self) -> &SimRouting {
        &self.routing
    }

    /// Get the current simulation time.
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Get collected metrics.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Whether a neighbor currently sends traffic.
    pub fn is_neighbor_alive(&self, neighbor: &Address) -> bool {
        self.neighbors.get(neighbor).is_some_and(|n| n.alive)
    }

    /// Schedule an event.
    pub fn schedule(&mut self, time: Timestamp, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    /// Schedule a scenario action.
    pub fn schedule_action(&mut self, time: Timestamp, action: ScenarioAction) {
        self.schedule(time, Event::Scenario(action));
    }

    /// Schedule a retrieval by one observer.
    pub fn schedule_fetch(&mut self, time: Timestamp, observer: usize) {
        self.schedule(time, Event::Fetch { observer });
    }

    /// Run simulation until specified time.
    pub fn run_until(&mut self, end_time: Timestamp) -> SimulationResult {
        while let Some(event) = self.event_queue.peek() {
            if event.time > end_time {
                break;
            }

            let Some(event) = self.event_queue.pop() else {
                break;
            };
            self.advance_time(event.time);
            self.process_event(event.event);

            self.maybe_take_snapshot();
        }

        // Advance to end_time even if no more events
        self.advance_time(end_time);

        // Final snapshot
        self.take_snapshot();

        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
            queue_exhausted: self.event_queue.peek().is_none(),
        }
    }

    /// Run simulation for specified duration.
    pub fn run_for(&mut self, duration: Duration) -> SimulationResult {
        self.run_until(self.current_time + duration)
    }

    /// Advance simulation time.
    fn advance_time(&mut self, time: Timestamp) {
        if time > self.current_time {
            self.current_time = time;
            self.resource.clock().set(time);
        }
    }

    /// Process a single event.
    fn process_event(&mut self, event: Event) {
        match event {
            Event::Packet { from, generation } => self.deliver_packet(from, generation),
            Event::RouteChange {
                notification,
                route,
            } => self.report_route_change(notification, route),
            Event::Timer { generation } => self.fire_timer(generation),
            Event::Fetch { observer } => self.fetch(observer),
            Event::Scenario(action) => self.execute_action(action),
        }
        self.reschedule_timer();
    }

    /// Feed one event through the resource's channel, as the packet hook and
    /// the routing callback of a real node do.
    fn submit(&mut self, event: TopologyEvent) {
        if let Err(rejected) = self.resource.events().try_send(event) {
            warn!(?rejected, "event channel full");
        }
        let now = self.current_time;
        while let Ok(event) = self.resource.events().try_receive() {
            self.resource.handle_event(event, now);
        }
    }

    fn deliver_packet(&mut self, from: Address, generation: u32) {
        let Some(neighbor) = self.neighbors.get(&from).copied() else {
            return;
        };
        if !neighbor.alive || neighbor.generation != generation {
            return;
        }

        if self.loss_rate > 0.0 && self.random_f64() < self.loss_rate {
            self.metrics.packets_dropped += 1;
        } else {
            self.metrics.packets_observed += 1;
            self.submit(TopologyEvent::PacketReceived { from });
        }

        self.schedule(
            self.current_time + neighbor.interval,
            Event::Packet { from, generation },
        );
    }

    /// Deliver the routing callback for a table edit as its own event, after
    /// anything already queued for the current instant.
    fn schedule_route_change(&mut self, notification: RouteNotification, route: Route) {
        self.schedule(
            self.current_time,
            Event::RouteChange {
                notification,
                route,
            },
        );
    }

    fn report_route_change(&mut self, notification: RouteNotification, route: Route) {
        self.metrics.route_changes += 1;
        self.submit(TopologyEvent::RouteChanged {
            notification,
            route: route.destination,
            next_hop: route.next_hop,
            num_routes: self.routing.route_table().len(),
        });
    }

    /// Fire the resource's timers if this event belongs to the live chain.
    fn fire_timer(&mut self, generation: u64) {
        if generation != self.timer_generation {
            return;
        }
        self.scheduled_wake = None;
        self.resource.handle_timer(self.current_time);

        let raised = self.resource.notifier().take_pending();
        for _ in 0..raised {
            self.metrics.notifications += 1;
            let at = self.current_time + self.fetch_delay;
            for observer in 0..self.observers.len() {
                self.schedule_fetch(at, observer);
            }
        }
    }

    /// Keep exactly one live timer event, at the resource's next wake-up.
    fn reschedule_timer(&mut self) {
        let wake = self.resource.next_wake().max(self.current_time);
        if self.scheduled_wake == Some(wake) {
            return;
        }
        self.timer_generation += 1;
        self.scheduled_wake = Some(wake);
        let generation = self.timer_generation;
        self.schedule(wake, Event::Timer { generation });
    }

    fn fetch(&mut self, index: usize) {
        let now = self.current_time;
        let Some(observer) = self.observers.get_mut(index) else {
            return;
        };

        match observer.fetch(&self.resource, &self.routing, now) {
            Ok(retrieval) => {
                self.metrics.fetches += 1;
                self.metrics.exchanges += retrieval.exchanges as u64;
                self.metrics.bytes_served += retrieval.body_len as u64;
                debug!(
                    observer = index,
                    exchanges = retrieval.exchanges,
                    children = retrieval.view.children.len(),
                    "retrieval complete"
                );
            }
            Err(error) => {
                self.metrics.fetch_errors += 1;
                warn!(observer = index, %error, "retrieval failed");
            }
        }
    }

    /// Execute a scenario action.
    fn execute_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::AddRoute(route) => {
                self.routing.add_route(route);
                self.schedule_route_change(RouteNotification::RouteAdded, route);
            }
            ScenarioAction::RemoveRoute { destination } => {
                if let Some(route) = self.routing.remove_route(&destination) {
                    self.schedule_route_change(RouteNotification::RouteRemoved, route);
                }
            }
            ScenarioAction::SetParent(parent) => {
                self.routing.set_parent(Some(parent));
                self.schedule_route_change(
                    RouteNotification::DefaultRouteAdded,
                    Route::new(Address::UNSPECIFIED, parent),
                );
            }
            ScenarioAction::ClearParent => {
                if let Some(parent) = self.routing.parent() {
                    self.routing.set_parent(None);
                    self.schedule_route_change(
                        RouteNotification::DefaultRouteRemoved,
                        Route::new(Address::UNSPECIFIED, parent),
                    );
                }
            }
            ScenarioAction::SetPrefix(prefix) => {
                self.routing.set_prefix(prefix);
            }
            ScenarioAction::StartTraffic { neighbor, interval } => {
                let entry = self.neighbors.entry(neighbor).or_insert(Neighbor {
                    interval,
                    alive: false,
                    generation: 0,
                });
                entry.interval = interval;
                entry.alive = true;
                entry.generation = entry.generation.wrapping_add(1);
                let generation = entry.generation;
                self.schedule(
                    self.current_time,
                    Event::Packet {
                        from: neighbor,
                        generation,
                    },
                );
            }
            ScenarioAction::StopTraffic { neighbor } => {
                if let Some(entry) = self.neighbors.get_mut(&neighbor) {
                    entry.alive = false;
                }
            }
            ScenarioAction::TakeSnapshot => {
                self.take_snapshot();
            }
        }
    }

    /// Check if we should take a snapshot and do so.
    fn maybe_take_snapshot(&mut self) {
        if let Some(next) = self.next_snapshot {
            if self.current_time >= next {
                self.take_snapshot();
                if let Some(interval) = self.snapshot_interval {
                    self.next_snapshot = Some(next + interval);
                }
            }
        }
    }

    /// Take a DAG state snapshot.
    pub fn take_snapshot(&mut self) {
        let routes: Vec<Route> = self.routing.routes().collect();
        let visible_children = routes
            .iter()
            .filter(|r| self.resource.is_reachable(&r.next_hop))
            .map(|r| r.destination)
            .collect();

        self.metrics.add_snapshot(DagSnapshot {
            time: self.current_time,
            parent: self.routing.parent(),
            routes,
            tracked: self
                .resource
                .tracked_neighbors()
                .into_iter()
                .map(|e| e.address)
                .collect(),
            visible_children,
            pending_notification: self.resource.pending_notification(),
        });
    }

    /// Generate a random f64 in [0, 1).
    fn random_f64(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.rng_state as f64) / (u64::MAX as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(n: u16) -> Address {
        Address::from_segments([0xfe80, 0, 0, 0, 0, 0, 0, n])
    }

    fn child(n: u16) -> Address {
        Address::from_segments([0xaaaa, 0, 0, 0, 0, 0, 0, n])
    }

    #[test]
    fn test_simulator_creation() {
        let sim = Simulator::new(42);
        assert_eq!(sim.current_time(), Timestamp::ZERO);
        assert!(sim.observers().is_empty());
        assert!(sim.routing().route_table().is_empty());
    }

    #[test]
    fn test_add_route_arms_debounce() {
        let mut sim = Simulator::new(42);
        sim.schedule_action(
            Timestamp::from_secs(1),
            ScenarioAction::AddRoute(Route::new(child(1), neighbor(1))),
        );
        sim.run_until(Timestamp::from_secs(2));

        assert_eq!(sim.metrics().route_changes, 1);
        assert_eq!(
            sim.resource().pending_notification(),
            Some(Timestamp::from_secs(31))
        );
    }

    #[test]
    fn test_route_callback_follows_table_edit() {
        let mut sim = Simulator::new(42);
        let at = Timestamp::from_secs(1);
        sim.schedule_action(at, ScenarioAction::AddRoute(Route::new(child(1), neighbor(1))));
        sim.schedule_action(at, ScenarioAction::TakeSnapshot);
        sim.run_until(at);

        // The snapshot ran between the edit and its callback.
        let edited = &sim.metrics().snapshots[0];
        assert_eq!(edited.time, at);
        assert_eq!(edited.routes, vec![Route::new(child(1), neighbor(1))]);
        assert_eq!(edited.pending_notification, None);

        assert_eq!(sim.metrics().route_changes, 1);
        assert_eq!(
            sim.resource().pending_notification(),
            Some(Timestamp::from_secs(31))
        );
    }

    #[test]
    fn test_parent_changes_do_not_notify() {
        let mut sim = Simulator::new(42);
        sim.add_observer(64);
        sim.schedule_action(Timestamp::from_secs(1), ScenarioAction::SetParent(neighbor(9)));
        sim.schedule_action(Timestamp::from_secs(5), ScenarioAction::ClearParent);
        let result = sim.run_for(Duration::from_secs(60));

        assert_eq!(result.metrics.route_changes, 2);
        assert_eq!(result.metrics.notifications, 0);
        assert_eq!(result.metrics.fetches, 0);
    }

    #[test]
    fn test_traffic_keeps_neighbor_tracked() {
        let mut sim = Simulator::new(42);
        sim.schedule_action(
            Timestamp::ZERO,
            ScenarioAction::StartTraffic {
                neighbor: neighbor(1),
                interval: Duration::from_secs(5),
            },
        );
        sim.run_until(Timestamp::from_secs(100));

        assert!(sim.resource().is_reachable(&neighbor(1)));
        // Packets at 0, 5, ..., 100.
        assert_eq!(sim.metrics().packets_observed, 21);
    }

    #[test]
    fn test_restarted_traffic_runs_one_chain() {
        let mut sim = Simulator::new(42);
        let start = ScenarioAction::StartTraffic {
            neighbor: neighbor(1),
            interval: Duration::from_secs(10),
        };
        sim.schedule_action(Timestamp::ZERO, start.clone());
        sim.schedule_action(
            Timestamp::from_secs(5),
            ScenarioAction::StopTraffic {
                neighbor: neighbor(1),
            },
        );
        sim.schedule_action(Timestamp::from_secs(5), start);
        sim.run_until(Timestamp::from_secs(45));

        // 0, then 5, 15, 25, 35, 45 from the restarted session only.
        assert_eq!(sim.metrics().packets_observed, 6);
        assert!(sim.is_neighbor_alive(&neighbor(1)));
    }

    #[test]
    fn test_silent_neighbor_is_evicted() {
        let mut sim = Simulator::new(42);
        sim.schedule_action(
            Timestamp::ZERO,
            ScenarioAction::StartTraffic {
                neighbor: neighbor(1),
                interval: Duration::from_secs(5),
            },
        );
        sim.schedule_action(
            Timestamp::from_secs(10),
            ScenarioAction::StopTraffic {
                neighbor: neighbor(1),
            },
        );
        sim.run_until(Timestamp::from_secs(60));

        assert!(!sim.is_neighbor_alive(&neighbor(1)));
        assert!(!sim.resource().is_reachable(&neighbor(1)));
    }

    #[test]
    fn test_total_loss_drops_every_packet() {
        let mut sim = Simulator::new(7).with_loss_rate(1.0);
        sim.schedule_action(
            Timestamp::ZERO,
            ScenarioAction::StartTraffic {
                neighbor: neighbor(1),
                interval: Duration::from_secs(1),
            },
        );
        sim.run_until(Timestamp::from_secs(9));

        assert_eq!(sim.metrics().packets_observed, 0);
        assert_eq!(sim.metrics().packets_dropped, 10);
        assert!(sim.resource().tracked_neighbors().is_empty());
    }

    #[test]
    fn test_snapshot_interval() {
        let mut sim = Simulator::new(42).with_snapshot_interval(Duration::from_secs(10));
        let result = sim.run_until(Timestamp::from_secs(35));

        // Timer events every second drive the interval snapshots at 10, 20, 30,
        // plus the final one.
        let times: Vec<_> = result
            .metrics
            .snapshots
            .iter()
            .map(|s| s.time.as_secs())
            .collect();
        assert_eq!(times, vec![10, 20, 30, 35]);
    }
}
