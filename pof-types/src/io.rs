//! Byte sink / byte source: the abstract sequential streams every other
//! layer of the engine is generic over.
//!
//! These mirror the shape of a typical canonical-encoding `Output`/`Input`
//! pair: single-byte and fixed-width writes/reads, plus the packed-integer
//! helpers layered on top in [`crate::packed`]. Position-querying and
//! seeking are intentionally absent here; the navigator tracks offsets
//! itself against the original slice instead of asking the source for them.

use crate::error::{Error, Result};
use alloc::vec::Vec;

/// A sink that bytes can be written into, in order.
pub trait PofSink {
    /// Write `bytes` to the sink.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Write a single byte.
    fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }
}

impl PofSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl PofSink for &mut Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }
}

/// A source that bytes can be read from, in order, with the ability to skip
/// without materializing the skipped bytes.
pub trait PofSource {
    /// Number of bytes remaining in the source.
    fn remaining(&self) -> usize;

    /// Fill `into` with the next `into.len()` bytes.
    fn read_bytes(&mut self, into: &mut [u8]) -> Result<()>;

    /// Read a single byte.
    fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_bytes(&mut b)?;
        Ok(b[0])
    }

    /// Discard the next `n` bytes without returning them.
    fn skip(&mut self, n: usize) -> Result<()>;
}

impl PofSource for &[u8] {
    fn remaining(&self) -> usize {
        self.len()
    }

    fn read_bytes(&mut self, into: &mut [u8]) -> Result<()> {
        if into.len() > self.len() {
            return Err(Error::MalformedStream("unexpected end of stream"));
        }
        let (head, tail) = self.split_at(into.len());
        into.copy_from_slice(head);
        *self = tail;
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        if n > self.len() {
            return Err(Error::MalformedStream("unexpected end of stream"));
        }
        *self = &self[n..];
        Ok(())
    }
}
