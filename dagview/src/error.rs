//! Errors returned by the resource handler.
//!
//! All errors are local to one exchange. The reachability table, the
//! debounce timer and the subscriber registrations survive every one of them.

use thiserror::Error;

use crate::coap::Status;

/// Diagnostic payload sent with [`ResourceError::BlockOutOfScope`].
pub const BLOCK_OUT_OF_SCOPE_DIAGNOSTIC: &str = "BlockOutOfScope";

/// Failure of a single GET exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The requester asked for a representation other than JSON.
    /// Nothing was mutated.
    #[error("requested representation is not acceptable")]
    NotAcceptable,
    /// The resumption offset lies at or beyond the end of the body.
    /// The requester must restart with a fresh offset.
    #[error("block offset beyond end of representation")]
    BlockOutOfScope,
    /// The transport buffer cannot hold a single byte of the body.
    #[error("transport buffer too small to make progress")]
    NoProgress,
}

impl ResourceError {
    /// Response status the transport should send for this error.
    pub const fn status(self) -> Status {
        match self {
            ResourceError::NotAcceptable => Status::NotAcceptable,
            ResourceError::BlockOutOfScope => Status::BadOption,
            ResourceError::NoProgress => Status::RequestEntityTooLarge,
        }
    }

    /// Short payload to accompany the status, if any.
    pub const fn diagnostic(self) -> Option<&'static str> {
        match self {
            ResourceError::BlockOutOfScope => Some(BLOCK_OUT_OF_SCOPE_DIAGNOSTIC),
            ResourceError::NotAcceptable | ResourceError::NoProgress => None,
        }
    }
}
