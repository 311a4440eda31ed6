//! The observable DoDAG resource.
//!
//! [`DagResource`] ties the pieces together:
//! - packet observations feed the [`ReachabilityTable`]
//! - route-table changes re-arm the [`DebounceTimer`]
//! - a firing timer marks the next GET as fresh and notifies subscribers
//! - each GET re-serializes the parent/children view through a [`ChunkWriter`]
//!
//! Body grammar:
//!
//! ```text
//! {"parent":["<addr>"],"child":["<addr>","<addr>",...]}
//! {"parent":[],"child":[]}
//! ```
//!
//! Table, timer and flags live behind one critical-section mutex so the
//! transport callback, the packet hook and the run loop can share the
//! resource through `&self`. A GET holds the lock only to copy the
//! reachability table; the route walk and address formatting run unlocked
//! against that copy.

#[cfg(any(test, feature = "debug"))]
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::marker::PhantomData;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use crate::coap::{BlockOffset, Reply, Request};
use crate::config::{DefaultConfig, ResourceConfig};
use crate::cursor::{ChunkSummary, ChunkWriter};
#[cfg(any(test, feature = "debug"))]
use crate::debug::{DebugEmitter, DebugEvent};
use crate::debounce::DebounceTimer;
use crate::error::ResourceError;
use crate::reachability::{Observation, ReachabilityEntry, ReachabilityTable};
use crate::time::Timestamp;
use crate::traits::{ChannelMutex, Clock, EventChannel, Notify, RoutingEngine};
use crate::types::{Address, TopologyEvent, DAG_CHILD_LABEL, DAG_PARENT_LABEL};

/// Mutable state shared between the event, timer and GET paths.
struct ResourceState {
    table: ReachabilityTable,
    debounce: DebounceTimer,
    /// Set when subscribers were notified; the next GET starts a fresh body.
    fresh_notification: bool,
    /// Bumped on every notification.
    notification_seq: u32,
    next_sweep: Timestamp,
}

/// Observable parent/children view of the routing tree.
///
/// Generic over:
/// - `Clk`: Clock/timer implementation
/// - `N`: subscriber notification primitive of the transport engine
/// - `C`: compile-time table size and timing
///
/// The routing engine is passed to [`handle_get`](Self::handle_get) rather
/// than owned, so the resource never holds a borrow of routing state between
/// exchanges.
pub struct DagResource<Clk, N, C = DefaultConfig> {
    clock: Clk,
    notifier: N,
    state: Mutex<ChannelMutex, RefCell<ResourceState>>,
    events: EventChannel,
    #[cfg(any(test, feature = "debug"))]
    debug: Mutex<ChannelMutex, RefCell<Option<Box<dyn DebugEmitter>>>>,
    _config: PhantomData<C>,
}

impl<Clk, N, C> DagResource<Clk, N, C>
where
    Clk: Clock,
    N: Notify,
    C: ResourceConfig,
{
    pub fn new(clock: Clk, notifier: N) -> Self {
        let now = clock.now();
        Self {
            clock,
            notifier,
            state: Mutex::new(RefCell::new(ResourceState {
                table: ReachabilityTable::with_capacity(C::MAX_TRACKED_NEIGHBORS),
                debounce: DebounceTimer::new(C::DEBOUNCE_INTERVAL),
                fresh_notification: false,
                notification_seq: 0,
                next_sweep: now + C::SWEEP_PERIOD,
            })),
            events: Channel::new(),
            #[cfg(any(test, feature = "debug"))]
            debug: Mutex::new(RefCell::new(None)),
            _config: PhantomData,
        }
    }

    /// Install an emitter for [`DebugEvent`]s, replacing any previous one.
    #[cfg(any(test, feature = "debug"))]
    pub fn set_debug_emitter(&self, emitter: Box<dyn DebugEmitter>) {
        self.debug.lock(|slot| *slot.borrow_mut() = Some(emitter));
    }

    #[cfg(any(test, feature = "debug"))]
    fn emit_debug(&self, event: DebugEvent) {
        self.debug.lock(|slot| {
            if let Some(emitter) = slot.borrow_mut().as_mut() {
                emitter.emit(event);
            }
        });
    }

    /// Channel for topology events, drained by [`run`](Self::run).
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn clock(&self) -> &Clk {
        &self.clock
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Snapshot of the tracked neighbors in slot order.
    pub fn tracked_neighbors(&self) -> Vec<ReachabilityEntry> {
        self.state
            .lock(|s| s.borrow().table.iter().collect::<Vec<_>>())
    }

    /// Whether routes through `next_hop` are currently shown.
    pub fn is_reachable(&self, next_hop: &Address) -> bool {
        self.state
            .lock(|s| s.borrow().table.contains_as_nexthop(next_hop))
    }

    /// When subscribers will next be notified, if a change is pending.
    pub fn pending_notification(&self) -> Option<Timestamp> {
        self.state.lock(|s| s.borrow().debounce.deadline())
    }

    /// Whether the next successful GET will ignore the caller's offset.
    pub fn is_fresh_notification(&self) -> bool {
        self.state.lock(|s| s.borrow().fresh_notification)
    }

    /// Earliest time [`handle_timer`](Self::handle_timer) has work to do.
    pub fn next_wake(&self) -> Timestamp {
        self.state.lock(|s| {
            let s = s.borrow();
            match s.debounce.deadline() {
                Some(fire_at) => fire_at.min(s.next_sweep),
                None => s.next_sweep,
            }
        })
    }

    /// Run the resource's event loop.
    ///
    /// Drains [`events`](Self::events) and wakes for sweeps and debounce
    /// deadlines. Runs forever; call it from an async task/executor.
    pub async fn run(&self) -> ! {
        loop {
            let wake = self.next_wake();

            match select(self.events.receive(), self.clock.sleep_until(wake)).await {
                Either::First(event) => {
                    let now = self.clock.now();
                    self.handle_event(event, now);
                }
                Either::Second(()) => {
                    let now = self.clock.now();
                    self.handle_timer(now);
                }
            }
        }
    }

    /// Apply one topology event.
    pub fn handle_event(&self, event: TopologyEvent, now: Timestamp) {
        match event {
            TopologyEvent::PacketReceived { from } => self.handle_packet(from, now),
            TopologyEvent::RouteChanged {
                notification,
                route: _route,
                ..
            } => {
                if !notification.affects_children() {
                    emit_debug!(self, DebugEvent::ChangeIgnored { notification });
                    return;
                }

                let _fire_at = self.state.lock(|s| s.borrow_mut().debounce.arm(now));
                emit_debug!(
                    self,
                    DebugEvent::DebounceArmed {
                        timestamp: now,
                        notification,
                        route: _route,
                        fire_at: _fire_at,
                    }
                );
            }
        }
    }

    fn handle_packet(&self, from: Address, now: Timestamp) {
        let (outcome, _occupied) = self.state.lock(|s| {
            let mut s = s.borrow_mut();
            let outcome = s.table.observe(from, now);
            (outcome, s.table.len())
        });

        emit_debug!(
            self,
            DebugEvent::PacketObserved {
                timestamp: now,
                from,
                outcome,
            }
        );
        match outcome {
            Observation::Inserted => {
                emit_debug!(
                    self,
                    DebugEvent::NeighborTracked {
                        timestamp: now,
                        address: from,
                        occupied: _occupied,
                    }
                );
            }
            Observation::Dropped => {
                emit_debug!(
                    self,
                    DebugEvent::NeighborDropped {
                        timestamp: now,
                        address: from,
                    }
                );
            }
            Observation::Refreshed => {}
        }
    }

    /// Run due sweeps and fire the debounce timer if its deadline passed.
    pub fn handle_timer(&self, now: Timestamp) {
        let (evicted, fired) = self.state.lock(|s| {
            let mut s = s.borrow_mut();
            let mut evicted = Vec::new();

            // One eviction per elapsed sweep period.
            while s.next_sweep <= now {
                match s.table.sweep(now, C::STALENESS_THRESHOLD) {
                    Some(entry) => {
                        evicted.push(entry);
                        s.next_sweep = s.next_sweep + C::SWEEP_PERIOD;
                    }
                    None => s.next_sweep = now + C::SWEEP_PERIOD,
                }
            }

            let fired = s.debounce.poll(now);
            if fired.is_some() {
                s.fresh_notification = true;
                s.notification_seq = s.notification_seq.wrapping_add(1);
            }
            (evicted, fired)
        });

        for _entry in evicted {
            emit_debug!(
                self,
                DebugEvent::NeighborEvicted {
                    timestamp: now,
                    address: _entry.address,
                    last_seen: _entry.last_seen,
                }
            );
        }

        if let Some(_coalesced) = fired {
            self.notifier.notify_subscribers();
            emit_debug!(
                self,
                DebugEvent::NotificationFired {
                    timestamp: now,
                    coalesced: _coalesced,
                }
            );
        }
    }

    /// Answer one GET exchange.
    ///
    /// Copies the chunk selected by `offset` into `buf` and updates `offset`
    /// for the next exchange ([`BlockOffset::END`] once the body is complete).
    /// A GET following a notification always starts at the beginning of the
    /// body, whatever offset the caller passes.
    pub fn handle_get<R: RoutingEngine>(
        &self,
        routing: &R,
        request: &Request,
        buf: &mut [u8],
        offset: &mut BlockOffset,
    ) -> Result<Reply, ResourceError> {
        let result = self.serve_chunk(routing, request, buf, offset);
        if let Err(_error) = result {
            emit_debug!(self, DebugEvent::QueryRejected { error: _error });
        }
        result
    }

    fn serve_chunk<R: RoutingEngine>(
        &self,
        routing: &R,
        request: &Request,
        buf: &mut [u8],
        offset: &mut BlockOffset,
    ) -> Result<Reply, ResourceError> {
        if !request.accepts_json() {
            return Err(ResourceError::NotAcceptable);
        }
        if buf.is_empty() {
            return Err(ResourceError::NoProgress);
        }

        let (table, fresh, seq) = self.state.lock(|s| {
            let s = s.borrow();
            (s.table.clone(), s.fresh_notification, s.notification_seq)
        });

        let start = if fresh { BlockOffset::END } else { *offset };
        let mut writer = ChunkWriter::resuming(buf, start);
        let _resume_from = writer.resume_from();
        write_body(&mut writer, routing, &table);
        let summary = writer.finish();

        // A notification raised during the walk stays pending.
        if fresh && summary.written > 0 {
            self.state.lock(|s| {
                let mut s = s.borrow_mut();
                if s.notification_seq == seq {
                    s.fresh_notification = false;
                }
            });
        }

        if summary.written == 0 {
            *offset = BlockOffset::END;
            return Err(ResourceError::BlockOutOfScope);
        }

        *offset = summary.next;
        emit_debug!(
            self,
            DebugEvent::ChunkServed {
                resume_from: _resume_from,
                written: summary.written,
                total: summary.total,
                next: summary.next,
                fresh,
            }
        );
        Ok(Reply::json(summary.written))
    }
}

/// Serialize the full body into `w`.
///
/// Walks every visible route on each call; only the writer's window decides
/// which bytes are copied. The route walk stops once the window is exceeded.
pub fn write_body<R: RoutingEngine>(
    w: &mut ChunkWriter<'_>,
    routing: &R,
    table: &ReachabilityTable,
) {
    w.write_str_item("{\"");
    w.write_str_item(DAG_PARENT_LABEL);
    w.write_str_item("\":[");
    if let Some(parent) = routing.default_route() {
        let parent = match routing.dag_prefix() {
            Some(prefix) => parent.with_prefix_group(&prefix),
            None => parent,
        };
        w.write_char('"');
        w.write_address(&parent);
        w.write_char('"');
    }
    w.write_str_item("],\"");
    w.write_str_item(DAG_CHILD_LABEL);
    w.write_str_item("\":[");

    let mut first = true;
    for route in routing
        .routes()
        .filter(|r| table.contains_as_nexthop(&r.next_hop))
    {
        if w.window_exceeded() {
            break;
        }
        if !first {
            w.write_char(',');
        }
        first = false;
        w.write_char('"');
        w.write_address(&route.destination);
        w.write_char('"');
    }

    w.write_str_item("]}");
}

/// Length of the complete body for the given routing state and table.
pub fn body_len<R: RoutingEngine>(routing: &R, table: &ReachabilityTable) -> usize {
    // Resuming past any reachable position counts every byte without ever
    // exceeding the window.
    let mut empty: [u8; 0] = [];
    let mut w = ChunkWriter::new(&mut empty, usize::MAX);
    write_body(&mut w, routing, table);
    let ChunkSummary { total, .. } = w.finish();
    total
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec;
    use core::pin::pin;
    use core::task::Poll;

    use super::*;
    use crate::coap::{ContentFormat, Status};
    use crate::config::SmallConfig;
    use crate::time::Duration;
    use crate::traits::test_impls::{MockClock, MockNotify, MockRouting, RecordingEmitter};
    use crate::types::{Route, RouteNotification};

    type TestResource = DagResource<MockClock, MockNotify, SmallConfig>;

    fn resource() -> TestResource {
        DagResource::new(MockClock::new(), MockNotify::new())
    }

    fn addr(n: u16) -> Address {
        Address::from_segments([0xaaaa, 0, 0, 0, 0, 0, 0, n])
    }

    fn link_local(n: u16) -> Address {
        Address::from_segments([0xfe80, 0, 0, 0, 0, 0, 0, n])
    }

    fn route_added(route: Address, next_hop: Address) -> TopologyEvent {
        TopologyEvent::RouteChanged {
            notification: RouteNotification::RouteAdded,
            route,
            next_hop,
            num_routes: 1,
        }
    }

    /// Fetch the whole body with `capacity`-byte chunks.
    fn fetch(res: &TestResource, routing: &MockRouting, capacity: usize) -> String {
        let mut body = Vec::new();
        let mut offset = BlockOffset::END;
        let mut buf = vec![0u8; capacity];
        loop {
            let reply = res
                .handle_get(routing, &Request::any(), &mut buf, &mut offset)
                .unwrap();
            body.extend_from_slice(&buf[..reply.payload_len]);
            if offset.is_end() {
                return String::from_utf8(body).unwrap();
            }
        }
    }

    #[test]
    fn test_empty_view() {
        let res = resource();
        assert_eq!(
            fetch(&res, &MockRouting::new(), 64),
            r#"{"parent":[],"child":[]}"#
        );
    }

    #[test]
    fn test_parent_rewritten_with_dag_prefix() {
        let res = resource();
        let parent = Address::from_segments([0xfe80, 0, 0, 0, 0x0212, 0x7402, 0x0002, 0x0202]);
        let routing = MockRouting::new()
            .with_parent(parent)
            .with_prefix(Address::from_segments([0xaaaa, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(
            fetch(&res, &routing, 64),
            r#"{"parent":["aaaa::212:7402:2:202"],"child":[]}"#
        );
    }

    #[test]
    fn test_parent_without_prefix_kept_as_is() {
        let res = resource();
        let routing = MockRouting::new().with_parent(link_local(1));
        assert_eq!(
            fetch(&res, &routing, 64),
            r#"{"parent":["fe80::1"],"child":[]}"#
        );
    }

    #[test]
    fn test_children_filtered_by_reachability() {
        let res = resource();
        let routing = MockRouting::new()
            .with_route(addr(2), link_local(2))
            .with_route(addr(3), link_local(3))
            .with_route(addr(4), link_local(2));

        assert_eq!(fetch(&res, &routing, 64), r#"{"parent":[],"child":[]}"#);

        res.handle_event(
            TopologyEvent::PacketReceived {
                from: link_local(2),
            },
            Timestamp::ZERO,
        );
        assert_eq!(
            fetch(&res, &routing, 128),
            r#"{"parent":[],"child":["aaaa::2","aaaa::4"]}"#
        );
    }

    #[test]
    fn test_stale_child_hidden_after_sweep() {
        let res = resource();
        let routing = MockRouting::new()
            .with_route(addr(2), link_local(2))
            .with_route(addr(3), link_local(3));
        res.handle_event(TopologyEvent::PacketReceived { from: link_local(2) }, Timestamp::ZERO);
        res.handle_event(
            TopologyEvent::PacketReceived { from: link_local(3) },
            Timestamp::from_secs(20),
        );

        res.handle_timer(Timestamp::from_secs(31));
        assert!(!res.is_reachable(&link_local(2)));
        assert!(res.is_reachable(&link_local(3)));
        assert_eq!(
            fetch(&res, &routing, 64),
            r#"{"parent":[],"child":["aaaa::3"]}"#
        );
    }

    #[test]
    fn test_chunked_fetch_matches_single_fetch() {
        let res = resource();
        let mut routing = MockRouting::new()
            .with_parent(link_local(1))
            .with_prefix(addr(0));
        for n in 2..6 {
            routing = routing.with_route(addr(n), link_local(n));
            res.handle_event(
                TopologyEvent::PacketReceived { from: link_local(n) },
                Timestamp::ZERO,
            );
        }

        let expected = fetch(&res, &routing, 512);
        assert_eq!(
            expected,
            r#"{"parent":["aaaa::1"],"child":["aaaa::2","aaaa::3","aaaa::4","aaaa::5"]}"#
        );
        for capacity in [1, 2, 7, 16, 32, expected.len() - 1, expected.len()] {
            assert_eq!(fetch(&res, &routing, capacity), expected, "capacity {}", capacity);
        }
    }

    #[test]
    fn test_continuation_offsets() {
        let res = resource();
        let routing = MockRouting::new();
        let body_len = r#"{"parent":[],"child":[]}"#.len();
        let mut buf = [0u8; 16];
        let mut offset = BlockOffset::END;

        let reply = res
            .handle_get(&routing, &Request::any(), &mut buf, &mut offset)
            .unwrap();
        assert_eq!(reply.payload_len, 16);
        assert_eq!(reply.status, Status::Content);
        assert_eq!(reply.content_format, ContentFormat::Json);
        assert_eq!(offset, BlockOffset::at(16));

        let reply = res
            .handle_get(&routing, &Request::any(), &mut buf, &mut offset)
            .unwrap();
        assert_eq!(reply.payload_len, body_len - 16);
        assert!(offset.is_end());
    }

    #[test]
    fn test_not_acceptable_mutates_nothing() {
        let res = resource();
        res.handle_event(route_added(addr(2), link_local(2)), Timestamp::ZERO);
        res.handle_timer(Timestamp::from_secs(30));
        assert!(res.is_fresh_notification());

        let mut buf = [0u8; 64];
        let mut offset = BlockOffset::at(5);
        let err = res
            .handle_get(
                &MockRouting::new(),
                &Request::accepting(ContentFormat::Cbor),
                &mut buf,
                &mut offset,
            )
            .unwrap_err();

        assert_eq!(err, ResourceError::NotAcceptable);
        assert_eq!(err.status(), Status::NotAcceptable);
        assert_eq!(offset, BlockOffset::at(5));
        assert!(res.is_fresh_notification());
    }

    #[test]
    fn test_fresh_notification_restarts_body() {
        let res = resource();
        let routing = MockRouting::new();
        res.handle_event(route_added(addr(2), link_local(2)), Timestamp::ZERO);
        res.handle_timer(Timestamp::from_secs(30));
        assert_eq!(res.notifier().count(), 1);

        // Stale offset from an earlier retrieval is ignored.
        let mut buf = [0u8; 8];
        let mut offset = BlockOffset::at(16);
        res.handle_get(&routing, &Request::any(), &mut buf, &mut offset)
            .unwrap();
        assert_eq!(&buf, b"{\"parent");
        assert_eq!(offset, BlockOffset::at(8));
        assert!(!res.is_fresh_notification());

        // Subsequent exchanges honor the offset.
        res.handle_get(&routing, &Request::any(), &mut buf, &mut offset)
            .unwrap();
        assert_eq!(&buf, b"\":[],\"ch");
        assert_eq!(offset, BlockOffset::at(16));
    }

    #[test]
    fn test_offset_beyond_body_is_out_of_scope() {
        let res = resource();
        let len = r#"{"parent":[],"child":[]}"#.len() as u32;
        let mut buf = [0u8; 16];
        let mut offset = BlockOffset::at(len);

        let err = res
            .handle_get(&MockRouting::new(), &Request::any(), &mut buf, &mut offset)
            .unwrap_err();
        assert_eq!(err, ResourceError::BlockOutOfScope);
        assert_eq!(err.status(), Status::BadOption);
        assert_eq!(err.diagnostic(), Some("BlockOutOfScope"));
        assert!(offset.is_end());

        // One byte before the end still succeeds.
        let mut offset = BlockOffset::at(len - 1);
        let reply = res
            .handle_get(&MockRouting::new(), &Request::any(), &mut buf, &mut offset)
            .unwrap();
        assert_eq!(reply.payload_len, 1);
        assert_eq!(buf[0], b'}');
    }

    #[test]
    fn test_zero_capacity_is_no_progress() {
        let res = resource();
        let mut buf: [u8; 0] = [];
        let mut offset = BlockOffset::END;
        let err = res
            .handle_get(&MockRouting::new(), &Request::any(), &mut buf, &mut offset)
            .unwrap_err();
        assert_eq!(err, ResourceError::NoProgress);
        assert!(offset.is_end());
    }

    #[test]
    fn test_route_changes_coalesce_into_one_notification() {
        let res = resource();
        for i in 0..5u64 {
            let now = Timestamp::from_secs(i * 10);
            res.handle_timer(now);
            res.handle_event(route_added(addr(i as u16), link_local(1)), now);
        }
        assert_eq!(res.pending_notification(), Some(Timestamp::from_secs(70)));

        res.handle_timer(Timestamp::from_secs(69));
        assert_eq!(res.notifier().count(), 0);
        res.handle_timer(Timestamp::from_secs(70));
        assert_eq!(res.notifier().count(), 1);
        res.handle_timer(Timestamp::from_secs(200));
        assert_eq!(res.notifier().count(), 1);
    }

    #[test]
    fn test_default_route_changes_ignored() {
        let res = resource();
        res.handle_event(
            TopologyEvent::RouteChanged {
                notification: RouteNotification::DefaultRouteAdded,
                route: Address::UNSPECIFIED,
                next_hop: link_local(1),
                num_routes: 0,
            },
            Timestamp::ZERO,
        );
        assert_eq!(res.pending_notification(), None);
    }

    #[test]
    fn test_next_wake() {
        let res = resource();
        assert_eq!(res.next_wake(), Timestamp::from_secs(1));

        res.handle_timer(Timestamp::from_secs(1));
        assert_eq!(res.next_wake(), Timestamp::from_secs(2));

        res.handle_event(route_added(addr(2), link_local(2)), Timestamp::from_millis(1500));
        assert_eq!(res.next_wake(), Timestamp::from_secs(2));
        assert_eq!(res.pending_notification(), Some(Timestamp::from_millis(31_500)));
    }

    #[test]
    fn test_one_eviction_per_sweep_period() {
        let res = resource();
        for n in 1..=3 {
            res.handle_event(TopologyEvent::PacketReceived { from: link_local(n) }, Timestamp::ZERO);
        }
        for t in 1..=30 {
            res.handle_timer(Timestamp::from_secs(t));
        }
        assert_eq!(res.tracked_neighbors().len(), 3);

        res.handle_timer(Timestamp::from_secs(31));
        assert_eq!(res.tracked_neighbors().len(), 2);
        res.handle_timer(Timestamp::from_secs(32));
        assert_eq!(res.tracked_neighbors().len(), 1);
    }

    #[test]
    fn test_late_timer_catches_up_sweeps() {
        let res = resource();
        for n in 1..=3 {
            res.handle_event(TopologyEvent::PacketReceived { from: link_local(n) }, Timestamp::ZERO);
        }
        // Many sweep periods elapsed at once.
        res.handle_timer(Timestamp::from_secs(100));
        assert!(res.tracked_neighbors().is_empty());
        assert_eq!(res.next_wake(), Timestamp::from_secs(101));
    }

    #[test]
    fn test_table_capacity_from_config() {
        let res = resource();
        for n in 1..=6 {
            res.handle_event(TopologyEvent::PacketReceived { from: link_local(n) }, Timestamp::ZERO);
        }
        assert_eq!(res.tracked_neighbors().len(), SmallConfig::MAX_TRACKED_NEIGHBORS);
        assert!(!res.is_reachable(&link_local(5)));
    }

    #[test]
    fn test_debug_events() {
        let res = resource();
        let recorder = RecordingEmitter::new();
        res.set_debug_emitter(Box::new(recorder.clone()));

        res.handle_event(TopologyEvent::PacketReceived { from: link_local(1) }, Timestamp::ZERO);
        res.handle_event(route_added(addr(1), link_local(1)), Timestamp::ZERO);
        res.handle_timer(Timestamp::from_secs(30));

        let events = recorder.take();
        assert!(events.contains(&DebugEvent::NeighborTracked {
            timestamp: Timestamp::ZERO,
            address: link_local(1),
            occupied: 1,
        }));
        assert!(events.contains(&DebugEvent::DebounceArmed {
            timestamp: Timestamp::ZERO,
            notification: RouteNotification::RouteAdded,
            route: addr(1),
            fire_at: Timestamp::from_secs(30),
        }));
        assert!(events.contains(&DebugEvent::NotificationFired {
            timestamp: Timestamp::from_secs(30),
            coalesced: 1,
        }));

        let mut buf = [0u8; 0];
        let mut offset = BlockOffset::END;
        let _ = res.handle_get(&MockRouting::new(), &Request::any(), &mut buf, &mut offset);
        assert_eq!(
            recorder.take(),
            vec![DebugEvent::QueryRejected {
                error: ResourceError::NoProgress
            }]
        );
    }

    #[test]
    fn test_body_len() {
        let res = resource();
        let routing = MockRouting::new()
            .with_parent(link_local(1))
            .with_route(addr(1), link_local(2))
            .with_route(addr(2), link_local(2));
        res.handle_event(
            TopologyEvent::PacketReceived { from: link_local(2) },
            Timestamp::ZERO,
        );
        let expected = fetch(&res, &routing, 64);
        let len = res.state.lock(|s| body_len(&routing, &s.borrow().table));
        assert_eq!(len, expected.len());
    }

    /// Routing engine that reads resource state while being walked.
    struct QueryingRouting<'r> {
        resource: &'r TestResource,
        inner: MockRouting,
    }

    impl RoutingEngine for QueryingRouting<'_> {
        type Routes<'a>
            = core::iter::Copied<core::slice::Iter<'a, Route>>
        where
            Self: 'a;

        fn default_route(&self) -> Option<Address> {
            let _ = self.resource.is_reachable(&link_local(1));
            self.inner.default_route()
        }

        fn dag_prefix(&self) -> Option<Address> {
            self.inner.dag_prefix()
        }

        fn routes(&self) -> Self::Routes<'_> {
            let _ = self.resource.tracked_neighbors();
            self.inner.routes.iter().copied()
        }
    }

    #[test]
    fn test_body_written_outside_state_lock() {
        let res = resource();
        res.handle_event(
            TopologyEvent::PacketReceived { from: link_local(1) },
            Timestamp::ZERO,
        );
        let routing = QueryingRouting {
            resource: &res,
            inner: MockRouting::new()
                .with_parent(link_local(1))
                .with_route(addr(1), link_local(1)),
        };

        let mut buf = [0u8; 64];
        let mut offset = BlockOffset::END;
        let reply = res
            .handle_get(&routing, &Request::any(), &mut buf, &mut offset)
            .unwrap();
        assert_eq!(
            core::str::from_utf8(&buf[..reply.payload_len]).unwrap(),
            r#"{"parent":["fe80::1"],"child":["aaaa::1"]}"#
        );
    }

    #[test]
    fn test_notification_during_get_stays_fresh() {
        let res = resource();
        res.handle_event(route_added(addr(1), link_local(1)), Timestamp::ZERO);
        res.handle_timer(Timestamp::from_secs(30));
        assert!(res.is_fresh_notification());

        // A second notification lands between the table copy and the
        // flag update of the next GET.
        res.handle_event(route_added(addr(2), link_local(1)), Timestamp::from_secs(31));
        struct FiringRouting<'r> {
            resource: &'r TestResource,
        }
        impl RoutingEngine for FiringRouting<'_> {
            type Routes<'a>
                = core::iter::Empty<Route>
            where
                Self: 'a;

            fn default_route(&self) -> Option<Address> {
                self.resource.handle_timer(Timestamp::from_secs(61));
                None
            }

            fn dag_prefix(&self) -> Option<Address> {
                None
            }

            fn routes(&self) -> Self::Routes<'_> {
                core::iter::empty()
            }
        }

        let mut buf = [0u8; 64];
        let mut offset = BlockOffset::END;
        res.handle_get(
            &FiringRouting { resource: &res },
            &Request::any(),
            &mut buf,
            &mut offset,
        )
        .unwrap();
        assert_eq!(res.notifier().count(), 2);
        assert!(res.is_fresh_notification());

        // The following GET consumes it.
        res.handle_get(&MockRouting::new(), &Request::any(), &mut buf, &mut offset)
            .unwrap();
        assert!(!res.is_fresh_notification());
    }

    #[test]
    fn test_run_loop_drains_events_and_fires() {
        let res = resource();
        let mut run = pin!(res.run());

        res.events()
            .try_send(TopologyEvent::PacketReceived { from: link_local(1) })
            .unwrap();
        res.events()
            .try_send(route_added(addr(1), link_local(1)))
            .unwrap();

        assert!(matches!(
            embassy_futures::poll_once(run.as_mut()),
            Poll::Pending
        ));
        assert!(res.is_reachable(&link_local(1)));
        assert_eq!(res.pending_notification(), Some(Timestamp::from_secs(30)));
        assert_eq!(res.notifier().count(), 0);

        res.clock().set(Timestamp::from_secs(30));
        assert!(matches!(
            embassy_futures::poll_once(run.as_mut()),
            Poll::Pending
        ));
        assert_eq!(res.notifier().count(), 1);
        assert!(res.is_fresh_notification());
    }

    #[test]
    fn test_clock_accessor() {
        let res = resource();
        res.clock().advance(Duration::from_secs(3));
        assert_eq!(res.now(), Timestamp::from_secs(3));
    }
}
