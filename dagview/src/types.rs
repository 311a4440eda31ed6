//! Core types and constants for the DoDAG resource.

use core::fmt;
use core::net::Ipv6Addr;

/// Resource path under which the DoDAG view is served.
pub const DAG_RESOURCE_PATH: &str = "rpl/dag";

/// Link-format attributes advertised for the resource.
pub const DAG_RESOURCE_ATTRIBUTES: &str = "obs;title=\"RPL DAG Parent and Children\"";

/// JSON key holding the preferred parent list.
pub const DAG_PARENT_LABEL: &str = "parent";

/// JSON key holding the children list.
pub const DAG_CHILD_LABEL: &str = "child";

/// Longest canonical text form of an IPv6 address (IPv4-mapped form).
pub const MAX_ADDRESS_TEXT_LEN: usize = 45;

/// 128-bit network address of a node or neighbor.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 16]);

impl Address {
    /// The unspecified address (`::`).
    pub const UNSPECIFIED: Address = Address([0u8; 16]);

    pub const fn new(bytes: [u8; 16]) -> Self {
        Address(bytes)
    }

    /// Build from eight 16-bit groups, as written in text form.
    pub const fn from_segments(s: [u16; 8]) -> Self {
        let mut bytes = [0u8; 16];
        let mut i = 0;
        while i < 8 {
            bytes[2 * i] = (s[i] >> 8) as u8;
            bytes[2 * i + 1] = s[i] as u8;
            i += 1;
        }
        Address(bytes)
    }

    pub const fn octets(&self) -> &[u8; 16] {
        &self.0
    }

    /// Copy of this address with the first 16-bit group taken from `prefix`.
    ///
    /// Turns the link-local next hop of the default route into the parent's
    /// address inside the DAG prefix.
    pub const fn with_prefix_group(&self, prefix: &Address) -> Address {
        let mut bytes = self.0;
        bytes[0] = prefix.0[0];
        bytes[1] = prefix.0[1];
        Address(bytes)
    }

    /// Canonical text form, formatted on the stack.
    pub fn to_text(&self) -> AddressText {
        let mut text = AddressText::new();
        // Ipv6Addr never produces more than MAX_ADDRESS_TEXT_LEN bytes.
        let _ = fmt::write(&mut text, format_args!("{}", Ipv6Addr::from(self.0)));
        text
    }
}

impl From<Ipv6Addr> for Address {
    fn from(addr: Ipv6Addr) -> Self {
        Address(addr.octets())
    }
}

impl From<Address> for Ipv6Addr {
    fn from(addr: Address) -> Self {
        Ipv6Addr::from(addr.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Ipv6Addr::from(self.0), f)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Fixed-size text buffer holding a formatted address.
#[derive(Clone, Copy)]
pub struct AddressText {
    buf: [u8; MAX_ADDRESS_TEXT_LEN],
    len: usize,
}

impl AddressText {
    const fn new() -> Self {
        Self {
            buf: [0u8; MAX_ADDRESS_TEXT_LEN],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Only whole `&str` fragments are ever appended.
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Write for AddressText {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// One entry of the routing engine's downward route table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    /// Destination reached through this route (shown as a child).
    pub destination: Address,
    /// Neighbor the route forwards through.
    pub next_hop: Address,
}

impl Route {
    pub const fn new(destination: Address, next_hop: Address) -> Self {
        Self {
            destination,
            next_hop,
        }
    }
}

/// Reason code carried by a routing-table change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteNotification {
    /// A downward route was added.
    RouteAdded,
    /// A downward route was removed.
    RouteRemoved,
    /// A default route was added.
    DefaultRouteAdded,
    /// A default route was removed.
    DefaultRouteRemoved,
}

impl RouteNotification {
    /// Whether this change can alter the children list and must be announced.
    pub const fn affects_children(self) -> bool {
        matches!(self, Self::RouteAdded | Self::RouteRemoved)
    }
}

/// Asynchronous input to the resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyEvent {
    /// A packet was received from `from`.
    PacketReceived { from: Address },
    /// The routing engine changed its route table.
    RouteChanged {
        notification: RouteNotification,
        /// Destination of the affected route.
        route: Address,
        /// Next hop of the affected route.
        next_hop: Address,
        /// Number of routes after the change.
        num_routes: usize,
    },
}
