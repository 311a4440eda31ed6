//! The slice of the request/response transport contract the resource uses.
//!
//! Header parsing and subscriber bookkeeping belong to the transport engine.
//! This module only carries what crosses the boundary: the accept option,
//! the response status and content format, and the opaque block offset
//! that lets one body be fetched over several exchanges.

use core::fmt;

/// Content-format identifiers understood by the resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    TextPlain,
    LinkFormat,
    Json,
    Cbor,
    /// Any registry value not listed above.
    Other(u16),
}

impl ContentFormat {
    /// Registry number of this format.
    pub const fn code(self) -> u16 {
        match self {
            ContentFormat::TextPlain => 0,
            ContentFormat::LinkFormat => 40,
            ContentFormat::Json => 50,
            ContentFormat::Cbor => 60,
            ContentFormat::Other(code) => code,
        }
    }

    pub const fn from_code(code: u16) -> Self {
        match code {
            0 => ContentFormat::TextPlain,
            40 => ContentFormat::LinkFormat,
            50 => ContentFormat::Json,
            60 => ContentFormat::Cbor,
            other => ContentFormat::Other(other),
        }
    }
}

/// Response codes used by the resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// 2.05
    Content,
    /// 4.02
    BadOption,
    /// 4.06
    NotAcceptable,
    /// 4.13
    RequestEntityTooLarge,
}

impl Status {
    /// Code in `class.detail` packed form (`class << 5 | detail`).
    pub const fn code(self) -> u8 {
        match self {
            Status::Content => (2 << 5) | 5,
            Status::BadOption => (4 << 5) | 2,
            Status::NotAcceptable => (4 << 5) | 6,
            Status::RequestEntityTooLarge => (4 << 5) | 13,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Status::Content)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        write!(f, "{}.{:02}", code >> 5, code & 0x1f)
    }
}

/// Incoming GET as seen by the resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Request {
    /// Accept option, if the requester sent one.
    pub accept: Option<ContentFormat>,
}

impl Request {
    /// Request without an accept option.
    pub const fn any() -> Self {
        Self { accept: None }
    }

    pub const fn accepting(format: ContentFormat) -> Self {
        Self {
            accept: Some(format),
        }
    }

    /// Whether a JSON reply satisfies this request.
    pub fn accepts_json(&self) -> bool {
        matches!(self.accept, None | Some(ContentFormat::Json))
    }
}

/// Successful answer to one exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub content_format: ContentFormat,
    /// Bytes of the caller's buffer holding this chunk.
    pub payload_len: usize,
}

impl Reply {
    pub(crate) const fn json(payload_len: usize) -> Self {
        Self {
            status: Status::Content,
            content_format: ContentFormat::Json,
            payload_len,
        }
    }
}

/// Resumption offset exchanged with the transport engine.
///
/// On input, [`BlockOffset::END`] (raw `-1`) asks for a fresh body from the
/// start. On output it means the body ended within the returned chunk; any
/// other value is the logical position the next exchange resumes at. Every
/// raw value accepted by [`from_raw`](Self::from_raw) round-trips unchanged
/// through [`to_raw`](Self::to_raw).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockOffset(Option<u32>);

impl BlockOffset {
    /// No further chunks / start afresh.
    pub const END: BlockOffset = BlockOffset(None);

    /// Start of the body.
    pub const START: BlockOffset = BlockOffset(Some(0));

    pub const fn at(position: u32) -> Self {
        BlockOffset(Some(position))
    }

    /// Decode the transport's signed representation.
    ///
    /// `-1` is [`END`](Self::END); other negative values are not offsets and
    /// yield `None`.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(BlockOffset::END),
            raw if raw < 0 => None,
            raw => Some(BlockOffset(Some(raw as u32))),
        }
    }

    /// Encode into the transport's signed representation.
    pub const fn to_raw(self) -> i32 {
        match self.0 {
            None => -1,
            Some(position) if position > i32::MAX as u32 => i32::MAX,
            Some(position) => position as i32,
        }
    }

    pub const fn is_end(self) -> bool {
        self.0.is_none()
    }

    pub const fn position(self) -> Option<u32> {
        self.0
    }
}

impl Default for BlockOffset {
    fn default() -> Self {
        BlockOffset::END
    }
}

impl fmt::Debug for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("BlockOffset(END)"),
            Some(p) => write!(f, "BlockOffset({})", p),
        }
    }
}
