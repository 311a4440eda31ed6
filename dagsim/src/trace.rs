//! Bridge from resource debug events to `tracing`.

use dagview::debug::{DebugEmitter, DebugEvent};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honouring `RUST_LOG`, defaulting to `info`.
///
/// Safe to call repeatedly; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Forwards every [`DebugEvent`] to `tracing` under the `dagview` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEmitter;

impl DebugEmitter for TracingEmitter {
    fn emit(&mut self, event: DebugEvent) {
        match event {
            DebugEvent::PacketObserved {
                timestamp,
                from,
                outcome,
            } => {
                debug!(target: "dagview", %timestamp, %from, ?outcome, "packet observed");
            }
            DebugEvent::NeighborTracked {
                timestamp,
                address,
                occupied,
            } => {
                info!(target: "dagview", %timestamp, %address, occupied, "neighbor tracked");
            }
            DebugEvent::NeighborDropped { timestamp, address } => {
                warn!(target: "dagview", %timestamp, %address, "reachability table full, neighbor not tracked");
            }
            DebugEvent::NeighborEvicted {
                timestamp,
                address,
                last_seen,
            } => {
                info!(target: "dagview", %timestamp, %address, %last_seen, "stale neighbor evicted");
            }
            DebugEvent::ChangeIgnored { notification } => {
                debug!(target: "dagview", ?notification, "route change ignored");
            }
            DebugEvent::DebounceArmed {
                timestamp,
                notification,
                route,
                fire_at,
            } => {
                debug!(target: "dagview", %timestamp, ?notification, %route, %fire_at, "notification debounced");
            }
            DebugEvent::NotificationFired {
                timestamp,
                coalesced,
            } => {
                info!(target: "dagview", %timestamp, coalesced, "subscribers notified");
            }
            DebugEvent::ChunkServed {
                resume_from,
                written,
                total,
                next,
                fresh,
            } => {
                debug!(target: "dagview", resume_from, written, total, ?next, fresh, "chunk served");
            }
            DebugEvent::QueryRejected { error } => {
                warn!(target: "dagview", %error, status = %error.status(), "query rejected");
            }
        }
    }
}
