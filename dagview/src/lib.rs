#![forbid(unsafe_code)]
//! dagview - Observable RPL DoDAG parent/children resource for constrained nodes
//!
//! Publishes a node's view of its routing tree (preferred parent plus the
//! children it routes for) as an observable JSON resource over a
//! request/response transport with small fixed-size message buffers.
//!
//! This crate is `no_std` but **requires the `alloc` crate**. The
//! reachability table is a heap-allocated slot array sized once at
//! construction from [`ResourceConfig::MAX_TRACKED_NEIGHBORS`].
//!
//! # Key Properties
//!
//! - Bodies longer than one transport buffer are fetched over several
//!   exchanges; every exchange re-serializes from scratch and copies only its
//!   window, so no iterator state survives between exchanges
//! - Routes are shown only while their next hop has been heard recently
//! - Bursts of routing changes produce a single subscriber notification
//! - No clock synchronization required; time is injected through [`Clock`]
//!
//! # Example (basic usage)
//!
//! ```
//! use core::future::{ready, Ready};
//!
//! use dagview::{
//!     Address, BlockOffset, Clock, DagResource, Notify, Request, Route, RoutingEngine,
//!     Timestamp, TopologyEvent,
//! };
//!
//! struct FixedClock;
//!
//! impl Clock for FixedClock {
//!     type SleepFuture<'a> = Ready<()>;
//!     fn now(&self) -> Timestamp {
//!         Timestamp::ZERO
//!     }
//!     fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
//!         ready(())
//!     }
//! }
//!
//! struct Quiet;
//!
//! impl Notify for Quiet {
//!     fn notify_subscribers(&self) {}
//! }
//!
//! struct Routes(Vec<Route>);
//!
//! impl RoutingEngine for Routes {
//!     type Routes<'a> = core::iter::Copied<core::slice::Iter<'a, Route>>;
//!     fn default_route(&self) -> Option<Address> {
//!         None
//!     }
//!     fn dag_prefix(&self) -> Option<Address> {
//!         None
//!     }
//!     fn routes(&self) -> Self::Routes<'_> {
//!         self.0.iter().copied()
//!     }
//! }
//!
//! let resource: DagResource<_, _> = DagResource::new(FixedClock, Quiet);
//!
//! let child = Address::from_segments([0xaaaa, 0, 0, 0, 0, 0, 0, 2]);
//! let neighbor = Address::from_segments([0xfe80, 0, 0, 0, 0, 0, 0, 2]);
//! let routing = Routes(vec![Route::new(child, neighbor)]);
//!
//! // Traffic from the next hop makes the route visible.
//! resource.handle_event(TopologyEvent::PacketReceived { from: neighbor }, Timestamp::ZERO);
//!
//! let mut buf = [0u8; 64];
//! let mut offset = BlockOffset::END;
//! let reply = resource
//!     .handle_get(&routing, &Request::any(), &mut buf, &mut offset)
//!     .unwrap();
//!
//! assert_eq!(&buf[..reply.payload_len], br#"{"parent":[],"child":["aaaa::2"]}"#);
//! assert!(offset.is_end());
//! ```
//!
//! # Example (integration pattern)
//!
//! ```text
//! use dagview::{DagResource, TopologyEvent};
//!
//! // Implement Clock and Notify for your platform...
//! // static RESOURCE: DagResource<EmbassyClock, CoapNotify> = ...;
//!
//! // Spawn the resource's run loop
//! // spawn(async move { RESOURCE.run().await });
//!
//! // From the packet input hook and the routing callback
//! // let _ = RESOURCE.events().try_send(TopologyEvent::PacketReceived { from });
//!
//! // From the transport's GET handler
//! // RESOURCE.handle_get(&rpl, &request, buf, &mut offset)
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Addresses, routes, topology events, resource constants
//! - [`coap`] - Accept option, status codes, block offset
//! - [`cursor`] - Chunked serialization into a transport buffer
//! - [`reachability`] - Traffic-driven neighbor liveness table
//! - [`debounce`] - Restart-on-event notification timer
//! - [`resource`] - The resource handler and run loop
//! - [`traits`] - Clock, RoutingEngine, Notify traits
//! - [`time`] - Timestamp and Duration types
//! - [`config`] - Compile-time table size and timing

#![no_std]

// Prevent test/debug features from being used in release builds.
#[cfg(all(feature = "test-support", not(test), not(debug_assertions)))]
compile_error!(
    "The `test-support` feature must not be enabled in release builds. \
     It exposes mock clocks and routing tables intended only for tests."
);

#[cfg(all(feature = "debug", not(test), not(debug_assertions)))]
compile_error!(
    "The `debug` feature must not be enabled in release builds. \
     It adds resource tracing overhead intended only for development and simulation."
);

extern crate alloc;

pub mod coap;
pub mod config;
pub mod cursor;
pub mod debounce;
#[macro_use]
pub mod debug;
pub mod error;
pub mod reachability;
pub mod resource;
pub mod time;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use coap::{BlockOffset, ContentFormat, Reply, Request, Status};
pub use config::{DefaultConfig, ResourceConfig, SmallConfig};
pub use cursor::{ChunkSummary, ChunkWriter, EmitResult};
pub use debounce::DebounceTimer;
pub use error::ResourceError;
pub use reachability::{Observation, ReachabilityEntry, ReachabilityTable};
pub use resource::DagResource;
pub use time::{Duration, Timestamp};
pub use traits::{Clock, EventChannel, Notify, RoutingEngine};
pub use types::{Address, Route, RouteNotification, TopologyEvent};

// Re-export constants
pub use types::{
    DAG_CHILD_LABEL, DAG_PARENT_LABEL, DAG_RESOURCE_ATTRIBUTES, DAG_RESOURCE_PATH,
};
