//! Collaborator traits for time, routing state and subscriber notification.
//!
//! The resource never owns the routing protocol or the transport engine.
//! These traits are the narrow seams through which it reads them:
//! - [`Clock`]: real hardware time or simulated time
//! - [`RoutingEngine`]: preferred parent, DAG prefix and the downward route table
//! - [`Notify`]: the transport's "notify all observers" primitive

use core::future::Future;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::time::Timestamp;
use crate::types::{Address, Route, TopologyEvent};

/// Queue size for the topology event channel.
pub const EVENT_QUEUE_SIZE: usize = 16;

/// Mutex type used for channels and shared state.
pub type ChannelMutex = CriticalSectionRawMutex;

/// Topology event channel. Packet and routing callbacks `try_send` into it.
pub type EventChannel = Channel<ChannelMutex, TopologyEvent, EVENT_QUEUE_SIZE>;

/// Time source trait for real or simulated time.
///
/// # Example (testing with MockClock)
///
/// ```ignore
/// use dagview::traits::test_impls::MockClock;
/// use dagview::{Clock, Duration, Timestamp};
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), Timestamp::ZERO);
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), Timestamp::from_secs(10));
/// ```
///
/// # Example (embedded with embassy)
///
/// ```text
/// struct EmbassyClock;
///
/// impl Clock for EmbassyClock {
///     type SleepFuture<'a> = embassy_time::Timer;
///
///     fn now(&self) -> Timestamp {
///         Timestamp::from_millis(embassy_time::Instant::now().as_millis())
///     }
///
///     fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_> {
///         embassy_time::Timer::at(embassy_time::Instant::from_millis(time.as_millis()))
///     }
/// }
/// ```
pub trait Clock {
    /// Future type returned by sleep_until.
    type SleepFuture<'a>: Future<Output = ()>
    where
        Self: 'a;

    /// Get the current timestamp.
    fn now(&self) -> Timestamp;

    /// Sleep until the given timestamp.
    fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_>;
}

/// Read-only view of the routing protocol's state.
///
/// Queried on every exchange. Implementations must return the same data for
/// the same snapshot so that a body fetched over several exchanges stays
/// consistent while the routing state is unchanged.
pub trait RoutingEngine {
    /// Iterator over the downward route table.
    type Routes<'a>: Iterator<Item = Route>
    where
        Self: 'a;

    /// Next hop of the default route, i.e. the preferred parent.
    fn default_route(&self) -> Option<Address>;

    /// Prefix of the joined DAG, if any.
    fn dag_prefix(&self) -> Option<Address>;

    /// Downward routes in the engine's native order.
    fn routes(&self) -> Self::Routes<'_>;
}

/// Subscriber notification provided by the transport engine.
///
/// The notification carries no payload; observers re-fetch the resource.
pub trait Notify {
    fn notify_subscribers(&self);
}

/// Mock implementations for testing.
///
/// Requires the `test-support` feature for external use.
#[cfg(any(test, feature = "test-support"))]
pub mod test_impls {
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll};

    use embassy_sync::blocking_mutex::Mutex;

    use super::*;
    use crate::debug::{DebugEmitter, DebugEvent};

    /// Mock clock for testing (synchronous, time advances manually).
    pub struct MockClock {
        current: Cell<Timestamp>,
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self {
                current: Cell::new(Timestamp::ZERO),
            }
        }
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn at(time: Timestamp) -> Self {
            Self {
                current: Cell::new(time),
            }
        }

        pub fn set(&self, time: Timestamp) {
            self.current.set(time);
        }

        pub fn advance(&self, duration: crate::time::Duration) {
            self.current.set(self.current.get() + duration);
        }
    }

    /// Completes once the test has moved the mock clock past the deadline.
    ///
    /// Never registers a waker; tests re-poll after adjusting time.
    pub struct MockSleep<'a> {
        clock: &'a MockClock,
        deadline: Timestamp,
    }

    impl Future for MockSleep<'_> {
        type Output = ();

        fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
            if self.clock.now() >= self.deadline {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        }
    }

    impl Clock for MockClock {
        type SleepFuture<'a> = MockSleep<'a>;

        fn now(&self) -> Timestamp {
            self.current.get()
        }

        fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_> {
            MockSleep {
                clock: self,
                deadline: time,
            }
        }
    }

    /// Routing state set up directly by the test.
    #[derive(Clone, Debug, Default)]
    pub struct MockRouting {
        pub parent: Option<Address>,
        pub prefix: Option<Address>,
        pub routes: Vec<Route>,
    }

    impl MockRouting {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_parent(mut self, parent: Address) -> Self {
            self.parent = Some(parent);
            self
        }

        pub fn with_prefix(mut self, prefix: Address) -> Self {
            self.prefix = Some(prefix);
            self
        }

        pub fn with_route(mut self, destination: Address, next_hop: Address) -> Self {
            self.routes.push(Route::new(destination, next_hop));
            self
        }
    }

    impl RoutingEngine for MockRouting {
        type Routes<'a> = core::iter::Copied<core::slice::Iter<'a, Route>>;

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

    /// Counts subscriber notifications.
    #[derive(Default)]
    pub struct MockNotify {
        count: Cell<u32>,
    }

    impl MockNotify {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn count(&self) -> u32 {
            self.count.get()
        }
    }

    impl Notify for MockNotify {
        fn notify_subscribers(&self) {
            self.count.set(self.count.get() + 1);
        }
    }

    type SharedLog = Mutex<ChannelMutex, RefCell<Vec<DebugEvent>>>;

    /// Emitter that records events; clones share one log.
    #[derive(Clone)]
    pub struct RecordingEmitter {
        log: Arc<SharedLog>,
    }

    impl Default for RecordingEmitter {
        fn default() -> Self {
            Self {
                log: Arc::new(Mutex::new(RefCell::new(Vec::new()))),
            }
        }
    }

    impl RecordingEmitter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Remove and return all recorded events.
        pub fn take(&self) -> Vec<DebugEvent> {
            self.log.lock(|log| core::mem::take(&mut *log.borrow_mut()))
        }
    }

    impl DebugEmitter for RecordingEmitter {
        fn emit(&mut self, event: DebugEvent) {
            self.log.lock(|log| log.borrow_mut().push(event));
        }
    }
}
