//! MySQL's length-encoded integers and strings.
//!
//! A length-encoded integer is a self-describing varint: the first byte
//! selects a width, with three reserved lead bytes (0xFB/0xFC/0xFD/0xFE)
//! used for NULL and wider widths. A length-encoded string is a
//! length-encoded integer byte count followed by that many raw bytes.

use bytes::{Buf, BufMut};

use crate::error::FramingError;

/// Sentinel lead byte meaning "this field is NULL" in a row packet.
pub const NULL_SENTINEL: u8 = 0xFB;

/// Read a length-encoded integer. Returns `None` if the wire value was the
/// NULL sentinel (0xFB); callers in a row context treat that as SQL NULL.
pub fn read_lenenc_int(src: &mut impl Buf) -> Result<Option<u64>, FramingError> {
    if !src.has_remaining() {
        return Err(FramingError::UnexpectedEof {
            needed: 1,
            available: 0,
        });
    }
    let lead = src.get_u8();
    match lead {
        0..=0xFA => Ok(Some(lead as u64)),
        NULL_SENTINEL => Ok(None),
        0xFC => {
            need(src, 2)?;
            Ok(Some(src.get_u16_le() as u64))
        }
        0xFD => {
            need(src, 3)?;
            let mut buf = [0u8; 4];
            src.copy_to_slice(&mut buf[..3]);
            Ok(Some(u32::from_le_bytes(buf) as u64))
        }
        0xFE => {
            need(src, 8)?;
            Ok(Some(src.get_u64_le()))
        }
        other => Err(FramingError::InvalidLengthPrefix(other)),
    }
}

/// Write a length-encoded integer.
pub fn write_lenenc_int(dst: &mut impl BufMut, value: u64) {
    if value < 0xFB {
        dst.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        dst.put_u8(0xFC);
        dst.put_u16_le(value as u16);
    } else if value <= 0xFF_FFFF {
        dst.put_u8(0xFD);
        dst.put_slice(&value.to_le_bytes()[..3]);
    } else {
        dst.put_u8(0xFE);
        dst.put_u64_le(value);
    }
}

/// Read a length-encoded string. Returns `None` for SQL NULL (lead byte
/// 0xFB), matching MySQL's row-packet NULL encoding.
pub fn read_lenenc_string(src: &mut impl Buf) -> Result<Option<Vec<u8>>, FramingError> {
    let Some(len) = read_lenenc_int(src)? else {
        return Ok(None);
    };
    let len = len as usize;
    need(src, len)?;
    let mut bytes = vec![0u8; len];
    src.copy_to_slice(&mut bytes);
    Ok(Some(bytes))
}

/// Write a length-encoded string (never NULL; callers write
/// [`NULL_SENTINEL`] directly for NULL values).
pub fn write_lenenc_string(dst: &mut impl BufMut, bytes: &[u8]) {
    write_lenenc_int(dst, bytes.len() as u64);
    dst.put_slice(bytes);
}

fn need(src: &impl Buf, n: usize) -> Result<(), FramingError> {
    if src.remaining() < n {
        Err(FramingError::UnexpectedEof {
            needed: n,
            available: src.remaining(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn small_int_roundtrip() {
        let mut buf = BytesMut::new();
        write_lenenc_int(&mut buf, 42);
        let mut cursor = buf.freeze();
        assert_eq!(read_lenenc_int(&mut cursor).unwrap(), Some(42));
    }

    #[test]
    fn two_byte_width_roundtrip() {
        let mut buf = BytesMut::new();
        write_lenenc_int(&mut buf, 1000);
        let mut cursor = buf.freeze();
        assert_eq!(cursor[0], 0xFC);
        assert_eq!(read_lenenc_int(&mut cursor.clone()).unwrap(), Some(1000));
    }

    #[test]
    fn eight_byte_width_roundtrip() {
        let mut buf = BytesMut::new();
        write_lenenc_int(&mut buf, u64::MAX - 1);
        let mut cursor = buf.freeze();
        assert_eq!(read_lenenc_int(&mut cursor).unwrap(), Some(u64::MAX - 1));
    }

    #[test]
    fn null_sentinel_is_none() {
        let mut cursor = bytes::Bytes::from_static(&[NULL_SENTINEL]);
        assert_eq!(read_lenenc_int(&mut cursor).unwrap(), None);
    }

    #[test]
    fn string_roundtrip() {
        let mut buf = BytesMut::new();
        write_lenenc_string(&mut buf, b"hello");
        let mut cursor = buf.freeze();
        assert_eq!(
            read_lenenc_string(&mut cursor).unwrap(),
            Some(b"hello".to_vec())
        );
    }

    #[test]
    fn string_null_roundtrip() {
        let mut cursor = bytes::Bytes::from_static(&[NULL_SENTINEL]);
        assert_eq!(read_lenenc_string(&mut cursor).unwrap(), None);
    }
}
