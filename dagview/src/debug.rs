//! Debug events for resource tracing.
//!
//! Enabled in test builds and with the `debug` feature. These events trace
//! table churn, debounce decisions and served chunks during simulation and
//! testing. Without either, `emit_debug!` expands to nothing and the event
//! expression is never evaluated.

use crate::coap::BlockOffset;
use crate::error::ResourceError;
use crate::reachability::Observation;
use crate::time::Timestamp;
use crate::types::{Address, RouteNotification};

/// Trait for receiving debug events from a resource.
/// Implemented by test harnesses to collect/print events.
pub trait DebugEmitter: Send {
    /// Called when a debug event is emitted.
    fn emit(&mut self, event: DebugEvent);
}

/// Debug events emitted by the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// Traffic observed from a neighbor.
    PacketObserved {
        timestamp: Timestamp,
        from: Address,
        outcome: Observation,
    },
    /// Neighbor claimed a free table slot.
    NeighborTracked {
        timestamp: Timestamp,
        address: Address,
        occupied: usize,
    },
    /// Table full; the neighbor is not tracked.
    NeighborDropped {
        timestamp: Timestamp,
        address: Address,
    },
    /// Sweep freed a stale neighbor.
    NeighborEvicted {
        timestamp: Timestamp,
        address: Address,
        last_seen: Timestamp,
    },
    /// Routing change that does not alter the children list.
    ChangeIgnored { notification: RouteNotification },
    /// Debounce timer (re)armed by a routing change.
    DebounceArmed {
        timestamp: Timestamp,
        notification: RouteNotification,
        route: Address,
        fire_at: Timestamp,
    },
    /// Debounce timer fired and subscribers were notified.
    NotificationFired {
        timestamp: Timestamp,
        coalesced: u32,
    },
    /// One chunk of the body was served.
    ChunkServed {
        resume_from: usize,
        written: usize,
        total: usize,
        next: BlockOffset,
        fresh: bool,
    },
    /// GET answered with an error status.
    QueryRejected { error: ResourceError },
}

/// Forward a debug event to the installed emitter.
///
/// `$target` must have an `emit_debug(&self, DebugEvent)` method. The event
/// expression is only evaluated in builds with tracing enabled.
macro_rules! emit_debug {
    ($target:expr, $event:expr) => {
        #[cfg(any(test, feature = "debug"))]
        {
            $target.emit_debug($event);
        }
    };
}
