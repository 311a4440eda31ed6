//! dagsim - Discrete event host simulator for the dagview resource.
//!
//! This crate hosts one [`dagview::DagResource`] in a deterministic,
//! discrete-event simulation: neighbors send traffic, the routing engine
//! changes its tables, and block-wise observers retrieve the resource every
//! time subscribers are notified, all without real-time delays.
//!
//! # Features
//!
//! - **Discrete event simulation**: No real-time delays, deterministic ordering
//! - **Neighbor traffic**: Periodic packets, start/stop, optional packet loss
//! - **Routing scenarios**: Scheduled route, parent and prefix changes
//! - **Observers**: Multi-exchange retrieval with per-observer block sizes
//! - **Metrics collection**: DAG snapshots, notification and exchange counts
//! - **Tracing**: Resource debug events forwarded to `tracing`
//!
//! # Example
//!
//! ```
//! use dagsim::{router_scenario, Duration};
//!
//! // A router with three children, observed with 32-byte blocks
//! let result = router_scenario(3)
//!     .observer(32)
//!     .run_for(Duration::from_secs(60));
//!
//! // The initial routes produce a single notification
//! assert_eq!(result.metrics.notifications, 1);
//! assert_eq!(result.final_children().len(), 3);
//! ```
//!
//! # Architecture
//!
//! The simulator uses a priority queue of events ordered by (time, sequence_number).
//! The main loop:
//! 1. Pop next event from queue
//! 2. Advance simulation time (and the resource's clock)
//! 3. Process event (feed the resource through its event channel)
//! 4. Collect notifications, schedule observer retrievals
//! 5. Reschedule the resource's timer at its next wake-up
//!
//! The simulator calls the synchronous handlers (`handle_event`,
//! `handle_timer`, `handle_get`) instead of the async `run()` loop.

pub mod event;
pub mod host;
pub mod metrics;
pub mod observer;
pub mod scenario;
pub mod sim;
pub mod trace;

// Re-export main types
pub use dagview::{Address, Duration, Route, Timestamp};
pub use event::{Event, ScenarioAction, ScheduledEvent};
pub use host::{SimClock, SimNotifier, SimResource, SimRouting};
pub use metrics::{DagSnapshot, SimMetrics, SimulationResult};
pub use observer::{DagView, FetchError, Observer, Retrieval};
pub use scenario::{child_address, neighbor_address, router_scenario, ScenarioBuilder};
pub use sim::Simulator;
pub use trace::{init_tracing, TracingEmitter};
