//! Simulated collaborators for a node hosting the DoDAG resource.

use std::cell::Cell;
use std::future::{ready, Ready};

use dagview::traits::{Clock, Notify, RoutingEngine};
use dagview::{Address, DagResource, DefaultConfig, Duration, Route, Timestamp};

/// The resource as hosted by the simulator.
pub type SimResource<C = DefaultConfig> = DagResource<SimClock, SimNotifier, C>;

/// Mock clock for simulation.
///
/// Time is controlled externally by the simulator.
pub struct SimClock {
    current: Cell<Timestamp>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current: Cell::new(Timestamp::ZERO),
        }
    }

    pub fn at(time: Timestamp) -> Self {
        Self {
            current: Cell::new(time),
        }
    }

    pub fn set(&self, time: Timestamp) {
        self.current.set(time);
    }

    pub fn advance(&self, duration: Duration) {
        self.current.set(self.current.get() + duration);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    type SleepFuture<'a> = Ready<()>;

    fn now(&self) -> Timestamp {
        self.current.get()
    }

    fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
        // The simulator calls handle_timer directly; the async loop is unused.
        ready(())
    }
}

/// Records subscriber notifications until the simulator collects them.
#[derive(Default)]
pub struct SimNotifier {
    pending: Cell<u32>,
    total: Cell<u64>,
}

impl SimNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications raised since the last call.
    pub fn take_pending(&self) -> u32 {
        self.pending.replace(0)
    }

    pub fn total(&self) -> u64 {
        self.total.get()
    }
}

impl Notify for SimNotifier {
    fn notify_subscribers(&self) {
        self.pending.set(self.pending.get() + 1);
        self.total.set(self.total.get() + 1);
    }
}

/// Routing state of the simulated node, edited by scenario actions.
#[derive(Debug, Clone, Default)]
pub struct SimRouting {
    parent: Option<Address>,
    prefix: Option<Address>,
    routes: Vec<Route>,
}

impl SimRouting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(&self) -> Option<Address> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<Address>) {
        self.parent = parent;
    }

    pub fn set_prefix(&mut self, prefix: Option<Address>) {
        self.prefix = prefix;
    }

    pub fn route_table(&self) -> &[Route] {
        &self.routes
    }

    /// Install or replace the route to `route.destination`.
    ///
    /// Returns the number of routes afterwards.
    pub fn add_route(&mut self, route: Route) -> usize {
        match self
            .routes
            .iter_mut()
            .find(|r| r.destination == route.destination)
        {
            Some(existing) => existing.next_hop = route.next_hop,
            None => self.routes.push(route),
        }
        self.routes.len()
    }

    /// Remove the route to `destination`, returning it if present.
    pub fn remove_route(&mut self, destination: &Address) -> Option<Route> {
        let index = self
            .routes
            .iter()
            .position(|r| r.destination == *destination)?;
        Some(self.routes.remove(index))
    }
}

impl RoutingEngine for SimRouting {
    type Routes<'a> = std::iter::Copied<std::slice::Iter<'a, Route>>;

    fn default_route(&self) -> Option<Address> {
        self.parent
    }

    fn dag_prefix(&self) -> Option<Address> {
        self.prefix
    }

    fn routes(&self) -> Self::Routes<'_> {
        self.routes.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u16) -> Address {
        Address::from_segments([0xaaaa, 0, 0, 0, 0, 0, 0, n])
    }

    #[test]
    fn test_add_route_replaces_next_hop() {
        let mut routing = SimRouting::new();
        assert_eq!(routing.add_route(Route::new(addr(1), addr(10))), 1);
        assert_eq!(routing.add_route(Route::new(addr(2), addr(10))), 2);
        assert_eq!(routing.add_route(Route::new(addr(1), addr(11))), 2);

        let hops: Vec<_> = routing.routes().map(|r| r.next_hop).collect();
        assert_eq!(hops, vec![addr(11), addr(10)]);
    }

    #[test]
    fn test_remove_route() {
        let mut routing = SimRouting::new();
        routing.add_route(Route::new(addr(1), addr(10)));
        assert!(routing.remove_route(&addr(2)).is_none());
        assert_eq!(
            routing.remove_route(&addr(1)),
            Some(Route::new(addr(1), addr(10)))
        );
        assert!(routing.route_table().is_empty());
    }

    #[test]
    fn test_notifier_pending_and_total() {
        let notifier = SimNotifier::new();
        notifier.notify_subscribers();
        notifier.notify_subscribers();
        assert_eq!(notifier.take_pending(), 2);
        assert_eq!(notifier.take_pending(), 0);
        assert_eq!(notifier.total(), 2);
    }

    #[test]
    fn test_clock() {
        let clock = SimClock::at(Timestamp::from_secs(5));
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Timestamp::from_secs(6));
    }
}
