//! Chunked serialization into a fixed-size transport buffer.
//!
//! A response body may be longer than one transport buffer. Rather than
//! materializing the body, the serializer is re-run on every exchange and
//! a [`ChunkWriter`] decides which bytes land in the buffer:
//!
//! ```text
//! logical body:  {"parent":["aaaa::1"],"child":["aaaa::2","aaaa::3"]}
//!                |<---- resume_from ---->|<--- capacity --->|
//!                   counted, not copied     copied             counted only
//! ```
//!
//! Two counters are kept apart on purpose: `position` counts every logical
//! byte produced since the start of the body, `written` counts bytes copied
//! into this exchange's buffer. After a full pass `position` is the body
//! length regardless of the buffer size, which is what tells the caller
//! whether another exchange is needed.
//!
//! The serializer must walk all of its source data on every call, even the
//! part that falls before `resume_from`. No iterator state survives between
//! exchanges; determinism of the walk is what makes resumption correct.

use core::fmt;

use crate::coap::BlockOffset;
use crate::types::Address;

/// Outcome of appending one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitResult {
    /// The item lies entirely before the resume point.
    Skipped,
    /// All bytes of the item past the resume point were copied.
    Copied(usize),
    /// Only a prefix fit. The tail is produced again next exchange.
    Truncated(usize),
    /// The buffer was already full.
    Dropped,
}

/// Result of one complete serialization pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Bytes copied into the buffer.
    pub written: usize,
    /// Logical bytes produced, i.e. the body length if the pass was complete.
    pub total: usize,
    /// Offset to hand back to the transport.
    pub next: BlockOffset,
}

/// Writes the window `[resume_from, resume_from + capacity)` of a logical
/// byte stream into a borrowed buffer.
pub struct ChunkWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
    position: usize,
    resume_from: usize,
}

impl<'a> ChunkWriter<'a> {
    /// Create a writer copying from logical position `resume_from` onward.
    pub fn new(buf: &'a mut [u8], resume_from: usize) -> Self {
        Self {
            buf,
            written: 0,
            position: 0,
            resume_from,
        }
    }

    /// Create a writer for the exchange described by `offset`.
    ///
    /// [`BlockOffset::END`] on input starts a fresh body.
    pub fn resuming(buf: &'a mut [u8], offset: BlockOffset) -> Self {
        let resume_from = offset.position().unwrap_or(0) as usize;
        Self::new(buf, resume_from)
    }

    /// Maximum bytes this chunk may hold.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes copied into the buffer so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Logical bytes produced so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn resume_from(&self) -> usize {
        self.resume_from
    }

    /// Free space left in the buffer.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.written
    }

    pub fn is_full(&self) -> bool {
        self.written == self.capacity()
    }

    /// True once the buffer is full and output has already run past the
    /// window, so another exchange is certain to be needed.
    ///
    /// Serializers may stop walking their source at this point; the summary
    /// still reports a continuation offset.
    pub fn window_exceeded(&self) -> bool {
        self.is_full() && self.position > self.window_end()
    }

    fn window_end(&self) -> usize {
        self.resume_from.saturating_add(self.capacity())
    }

    /// Append raw bytes as one item.
    pub fn write_bytes(&mut self, item: &[u8]) -> EmitResult {
        let start = self.position;
        self.position = self.position.saturating_add(item.len());

        if self.position <= self.resume_from {
            return EmitResult::Skipped;
        }
        if self.is_full() {
            return EmitResult::Dropped;
        }

        // The item may straddle the resume point; copy only its tail.
        let visible = &item[self.resume_from.saturating_sub(start)..];
        let n = visible.len().min(self.remaining());
        self.buf[self.written..self.written + n].copy_from_slice(&visible[..n]);
        self.written += n;

        if n < visible.len() {
            EmitResult::Truncated(n)
        } else {
            EmitResult::Copied(n)
        }
    }

    /// Append a single ASCII character.
    pub fn write_char(&mut self, c: char) -> EmitResult {
        let mut utf8 = [0u8; 4];
        self.write_bytes(c.encode_utf8(&mut utf8).as_bytes())
    }

    /// Append a literal string.
    pub fn write_str_item(&mut self, s: &str) -> EmitResult {
        self.write_bytes(s.as_bytes())
    }

    /// Append the canonical text form of an address.
    pub fn write_address(&mut self, addr: &Address) -> EmitResult {
        let text = addr.to_text();
        self.write_bytes(text.as_bytes())
    }

    /// Close the pass and compute the offset for the next exchange.
    pub fn finish(self) -> ChunkSummary {
        let next = if self.position <= self.window_end() {
            BlockOffset::END
        } else {
            let end = self.window_end();
            BlockOffset::at(u32::try_from(end).unwrap_or(u32::MAX))
        };
        ChunkSummary {
            written: self.written,
            total: self.position,
            next,
        }
    }
}

impl fmt::Write for ChunkWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}
