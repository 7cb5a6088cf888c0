//! String encodings used on the wire: TDS's UTF-16LE varchars and the
//! null-terminated C-strings PostgreSQL and MySQL both use for identifiers.

use bytes::{Buf, BufMut};

use crate::error::FramingError;

/// Read a length-prefixed UTF-16LE string with a 1-byte character count.
pub fn read_b_varchar(src: &mut impl Buf) -> Result<String, FramingError> {
    if src.remaining() < 1 {
        return Err(eof(1, src.remaining()));
    }
    let len = src.get_u8() as usize;
    read_utf16_string(src, len)
}

/// Read a length-prefixed UTF-16LE string with a 2-byte character count.
pub fn read_us_varchar(src: &mut impl Buf) -> Result<String, FramingError> {
    if src.remaining() < 2 {
        return Err(eof(2, src.remaining()));
    }
    let len = src.get_u16_le() as usize;
    read_utf16_string(src, len)
}

/// Read a UTF-16LE string of a known character count.
pub fn read_utf16_string(src: &mut impl Buf, char_count: usize) -> Result<String, FramingError> {
    let byte_count = char_count * 2;
    if src.remaining() < byte_count {
        return Err(eof(byte_count, src.remaining()));
    }

    let mut units = Vec::with_capacity(char_count);
    for _ in 0..char_count {
        units.push(src.get_u16_le());
    }

    String::from_utf16(&units).map_err(|_| FramingError::InvalidUtf16)
}

/// Write a length-prefixed UTF-16LE string (1-byte character count).
///
/// Characters beyond 255 are silently dropped; callers that need to enforce
/// the limit should validate length before calling.
pub fn write_b_varchar(dst: &mut impl BufMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    let len = units.len().min(u8::MAX as usize) as u8;
    dst.put_u8(len);
    for &c in &units[..len as usize] {
        dst.put_u16_le(c);
    }
}

/// Write a length-prefixed UTF-16LE string (2-byte character count).
pub fn write_us_varchar(dst: &mut impl BufMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    let len = units.len().min(u16::MAX as usize) as u16;
    dst.put_u16_le(len);
    for &c in &units[..len as usize] {
        dst.put_u16_le(c);
    }
}

/// Write a UTF-16LE string with no length prefix.
pub fn write_utf16_string(dst: &mut impl BufMut, s: &str) {
    for c in s.encode_utf16() {
        dst.put_u16_le(c);
    }
}

/// Byte length a string would occupy encoded as UTF-16LE.
#[must_use]
pub fn utf16_byte_len(s: &str) -> usize {
    s.encode_utf16().count() * 2
}

/// Read a NUL-terminated UTF-8 string (PostgreSQL and MySQL both frame
/// identifiers and error fields this way).
pub fn read_null_terminated_utf8(src: &mut impl Buf) -> Result<String, FramingError> {
    let mut bytes = Vec::new();
    loop {
        if !src.has_remaining() {
            return Err(eof(1, 0));
        }
        let b = src.get_u8();
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    String::from_utf8(bytes).map_err(FramingError::InvalidUtf8)
}

/// Write a UTF-8 string followed by a NUL terminator.
pub fn write_null_terminated_utf8(dst: &mut impl BufMut, s: &str) {
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
}

fn eof(needed: usize, available: usize) -> FramingError {
    FramingError::UnexpectedEof { needed, available }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn b_varchar_roundtrip() {
        let original = "Hello, world!";
        let mut buf = BytesMut::new();
        write_b_varchar(&mut buf, original);
        let mut cursor = buf.freeze();
        assert_eq!(read_b_varchar(&mut cursor).unwrap(), original);
    }

    #[test]
    fn us_varchar_roundtrip_unicode() {
        let original = "Unicode: \u{3b1}\u{3b2}\u{3b3}";
        let mut buf = BytesMut::new();
        write_us_varchar(&mut buf, original);
        let mut cursor = buf.freeze();
        assert_eq!(read_us_varchar(&mut cursor).unwrap(), original);
    }

    #[test]
    fn utf16_byte_len_counts_surrogate_pairs() {
        assert_eq!(utf16_byte_len("Hello"), 10);
        assert_eq!(utf16_byte_len("\u{4e16}\u{754c}"), 4);
    }

    #[test]
    fn null_terminated_roundtrip() {
        let mut buf = BytesMut::new();
        write_null_terminated_utf8(&mut buf, "public");
        let mut cursor = buf.freeze();
        assert_eq!(read_null_terminated_utf8(&mut cursor).unwrap(), "public");
    }

    #[test]
    fn truncated_buffer_is_an_error() {
        let mut cursor = bytes::Bytes::from_static(&[5, 0]);
        assert!(read_b_varchar(&mut cursor).is_err());
    }
}
