//! Compile-time configuration for table size and timing.
//!
//! The reachability table capacity follows the routing stack's maximum
//! route count, so a node never tracks more neighbors than it could route
//! through. Timing constants are independent of each other: the staleness
//! threshold defaults to the debounce interval but can be tuned separately.
//!
//! # Example
//!
//! ```ignore
//! use dagview::{DagResource, DefaultConfig, Duration, ResourceConfig};
//!
//! // Stock configuration
//! let resource = DagResource::<_, _, DefaultConfig>::new(clock, notify);
//!
//! // Custom configuration
//! struct FastFlap;
//! impl ResourceConfig for FastFlap {
//!     const MAX_TRACKED_NEIGHBORS: usize = 8;
//!     const DEBOUNCE_INTERVAL: Duration = Duration::from_secs(5);
//!     const STALENESS_THRESHOLD: Duration = Duration::from_secs(60);
//!     const SWEEP_PERIOD: Duration = Duration::from_secs(1);
//! }
//! ```

use crate::time::Duration;

/// Configuration trait for the DoDAG resource.
///
/// All bounds and periods must be non-zero.
pub trait ResourceConfig {
    /// Reachability table slots. Observations beyond this are not tracked.
    const MAX_TRACKED_NEIGHBORS: usize;

    /// Quiet period after the last routing change before subscribers are notified.
    const DEBOUNCE_INTERVAL: Duration;

    /// A neighbor silent for longer than this is no longer shown as a child.
    const STALENESS_THRESHOLD: Duration;

    /// Period of the eviction sweep.
    const SWEEP_PERIOD: Duration;
}

/// Debounce interval used by the stock configurations.
pub const DEFAULT_DEBOUNCE_SECS: u64 = 30;

/// Configuration matching a stock routing stack with 20 routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfig;

impl ResourceConfig for DefaultConfig {
    const MAX_TRACKED_NEIGHBORS: usize = 20;
    const DEBOUNCE_INTERVAL: Duration = Duration::from_secs(DEFAULT_DEBOUNCE_SECS);
    const STALENESS_THRESHOLD: Duration = Duration::from_secs(DEFAULT_DEBOUNCE_SECS);
    const SWEEP_PERIOD: Duration = Duration::from_secs(1);
}

/// Configuration for leaf-heavy deployments with a 4-entry route table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallConfig;

impl ResourceConfig for SmallConfig {
    const MAX_TRACKED_NEIGHBORS: usize = 4;
    const DEBOUNCE_INTERVAL: Duration = Duration::from_secs(DEFAULT_DEBOUNCE_SECS);
    const STALENESS_THRESHOLD: Duration = Duration::from_secs(DEFAULT_DEBOUNCE_SECS);
    const SWEEP_PERIOD: Duration = Duration::from_secs(1);
}
