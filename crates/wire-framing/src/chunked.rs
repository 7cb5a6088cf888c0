//! Reassembly of partially-length-prefixed (PLP) chunk sequences.
//!
//! TDS streams large column values (MAX-length text/binary/XML) as a total
//! length followed by a run of `(4-byte length, bytes)` chunks terminated by
//! a zero-length chunk. Two sentinel total-length values change that shape:
//! `UNKNOWN_LENGTH` means the total isn't known up front (chunks still
//! terminate on a zero-length chunk), and `NULL_LENGTH` means the column is
//! SQL NULL and no chunks follow at all.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::FramingError;

/// Total-length sentinel meaning "length not known ahead of time; read until
/// a zero-length chunk".
pub const UNKNOWN_LENGTH: u64 = 0xFFFF_FFFF_FFFF_FFFE;

/// Total-length sentinel meaning the value is SQL NULL.
pub const NULL_LENGTH: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// The declared shape of a PLP value, read from its 8-byte length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlpLength {
    /// The value is SQL NULL; no chunks follow.
    Null,
    /// Total length is not known; read chunks until a zero-length chunk.
    Unknown,
    /// Exactly `0` bytes of payload are present (and no chunks follow).
    Known(u64),
}

/// Read the 8-byte PLP length prefix.
pub fn read_plp_length(src: &mut impl Buf) -> Result<PlpLength, FramingError> {
    if src.remaining() < 8 {
        return Err(FramingError::UnexpectedEof {
            needed: 8,
            available: src.remaining(),
        });
    }
    Ok(match src.get_u64_le() {
        NULL_LENGTH => PlpLength::Null,
        UNKNOWN_LENGTH => PlpLength::Unknown,
        n => PlpLength::Known(n),
    })
}

/// Incrementally assembles the chunk sequence following a PLP length prefix
/// into one contiguous buffer.
///
/// Construct with the [`PlpLength`] read from the column's length prefix,
/// then feed each `(chunk_len, chunk_bytes)` pair read off the wire via
/// [`ChunkReassembler::push_chunk`] until [`ChunkReassembler::is_complete`]
/// returns `true`.
#[derive(Debug, Default)]
pub struct ChunkReassembler {
    buf: BytesMut,
    complete: bool,
}

impl ChunkReassembler {
    /// Start a new reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk. A `chunk_len` of zero marks the end of the
    /// sequence; the chunk's bytes (if any) must already match that length.
    pub fn push_chunk(&mut self, chunk_len: u32, chunk: &[u8]) -> Result<(), FramingError> {
        if self.complete {
            return Err(FramingError::MalformedChunks(
                "chunk pushed after terminator".to_string(),
            ));
        }
        if chunk_len == 0 {
            self.complete = true;
            return Ok(());
        }
        if chunk.len() != chunk_len as usize {
            return Err(FramingError::MalformedChunks(format!(
                "chunk declared {chunk_len} bytes but got {}",
                chunk.len()
            )));
        }
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    /// Whether the terminating zero-length chunk has been seen.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Consume the reassembler, returning the assembled bytes.
    ///
    /// # Panics
    ///
    /// Panics if [`ChunkReassembler::is_complete`] is `false`; callers must
    /// keep feeding chunks until the terminator arrives.
    #[must_use]
    pub fn finish(self) -> Bytes {
        assert!(self.complete, "chunk sequence was not terminated");
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_length_prefix_decodes() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&42u64.to_le_bytes());
        let mut cursor = buf.freeze();
        assert_eq!(read_plp_length(&mut cursor).unwrap(), PlpLength::Known(42));
    }

    #[test]
    fn sentinel_lengths_decode() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&NULL_LENGTH.to_le_bytes());
        let mut cursor = buf.freeze();
        assert_eq!(read_plp_length(&mut cursor).unwrap(), PlpLength::Null);

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&UNKNOWN_LENGTH.to_le_bytes());
        let mut cursor = buf.freeze();
        assert_eq!(read_plp_length(&mut cursor).unwrap(), PlpLength::Unknown);
    }

    #[test]
    fn reassembles_multiple_chunks() {
        let mut r = ChunkReassembler::new();
        r.push_chunk(5, b"hello").unwrap();
        r.push_chunk(6, b" world").unwrap();
        r.push_chunk(0, b"").unwrap();
        assert!(r.is_complete());
        assert_eq!(&r.finish()[..], b"hello world");
    }

    #[test]
    fn mismatched_chunk_length_is_an_error() {
        let mut r = ChunkReassembler::new();
        assert!(r.push_chunk(5, b"no").is_err());
    }

    #[test]
    fn chunk_after_terminator_is_an_error() {
        let mut r = ChunkReassembler::new();
        r.push_chunk(0, b"").unwrap();
        assert!(r.push_chunk(1, b"x").is_err());
    }

    #[test]
    #[should_panic(expected = "chunk sequence was not terminated")]
    fn finish_before_terminator_panics() {
        let r = ChunkReassembler::new();
        r.finish();
    }
}
