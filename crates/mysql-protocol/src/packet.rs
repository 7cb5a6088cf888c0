//! MySQL packet framing: a 3-byte little-endian length followed by a 1-byte
//! sequence number, repeated for payloads longer than `0xFF_FFFF` bytes
//! (each such packet is exactly that length, with the final chunk carrying
//! the remainder).

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// The largest single-chunk payload; longer payloads split across
/// multiple packets sharing consecutive sequence numbers.
pub const MAX_PAYLOAD: usize = 0xFF_FFFF;

/// Read one packet, returning its sequence number and payload. Does not
/// reassemble multi-packet payloads; callers needing that use
/// [`read_packet_reassembled`].
pub async fn read_packet<R>(reader: &mut R) -> Result<(u8, Bytes), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let seq = header[3];
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok((seq, Bytes::from(payload)))
}

/// Read a full logical payload, reassembling across `MAX_PAYLOAD`-sized
/// packet chains. Returns the final sequence number seen, for the caller's
/// next write.
pub async fn read_packet_reassembled<R>(reader: &mut R) -> Result<(u8, Bytes), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut combined = BytesMut::new();
    let mut last_seq = 0u8;
    loop {
        let (seq, chunk) = read_packet(reader).await?;
        last_seq = seq;
        let is_full = chunk.len() == MAX_PAYLOAD;
        combined.extend_from_slice(&chunk);
        if !is_full {
            break;
        }
    }
    Ok((last_seq, combined.freeze()))
}

/// Write one payload, splitting into `MAX_PAYLOAD`-sized chunks (with a
/// trailing zero-length packet if the payload is an exact multiple)
/// using consecutive sequence numbers starting at `seq`. Returns the next
/// sequence number to use.
pub async fn write_packet<W>(writer: &mut W, seq: u8, payload: &[u8]) -> Result<u8, ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut seq = seq;
    let mut remaining = payload;
    loop {
        let chunk_len = remaining.len().min(MAX_PAYLOAD);
        let (chunk, rest) = remaining.split_at(chunk_len);
        let mut header = BytesMut::with_capacity(4 + chunk.len());
        header.put_slice(&(chunk.len() as u32).to_le_bytes()[..3]);
        header.put_u8(seq);
        header.put_slice(chunk);
        writer.write_all(&header).await?;
        seq = seq.wrapping_add(1);
        remaining = rest;
        if chunk_len < MAX_PAYLOAD {
            break;
        }
        if remaining.is_empty() {
            // Exact multiple: MySQL requires an explicit zero-length packet
            // so the server knows the chain terminated.
            let mut header = BytesMut::with_capacity(4);
            header.put_slice(&[0, 0, 0]);
            header.put_u8(seq);
            writer.write_all(&header).await?;
            seq = seq.wrapping_add(1);
            break;
        }
    }
    writer.flush().await?;
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_small_packet() {
        let mut buf = Vec::new();
        write_packet(&mut buf, 0, b"hello").await.unwrap();
        let mut cursor = &buf[..];
        let (seq, payload) = read_packet(&mut cursor).await.unwrap();
        assert_eq!(seq, 0);
        assert_eq!(&payload[..], b"hello");
    }
}
