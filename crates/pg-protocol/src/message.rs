//! Frontend/backend message framing.
//!
//! Every message after the startup handshake is `tag(1) + len(4, includes
//! itself but not the tag) + payload`. The startup-phase messages
//! (`StartupMessage`, `SSLRequest`, `CancelRequest`) have no tag byte at
//! all: just `len(4, includes itself) + payload`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Refuse to allocate a message buffer larger than this many bytes.
const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// The special code carried by an `SSLRequest` packet in place of a
/// protocol version.
pub const SSL_REQUEST_CODE: i32 = 80_877_103;

/// The protocol version carried by every `StartupMessage` this engine sends.
pub const PROTOCOL_VERSION_3_0: i32 = 0x0003_0000;

/// One backend message: its type byte and payload (the length prefix and
/// tag are already stripped).
#[derive(Debug, Clone)]
pub struct BackendMessage {
    /// The message's type byte (`'R'`, `'Z'`, `'T'`, `'D'`, ...).
    pub tag: u8,
    /// Payload bytes following the length prefix.
    pub payload: Bytes,
}

/// Read one tagged backend message.
pub async fn read_message<R>(reader: &mut R) -> Result<BackendMessage, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let tag = reader.read_u8().await?;
    let payload = read_len_prefixed_payload(reader).await?;
    Ok(BackendMessage { tag, payload })
}

/// Read the startup-phase single-byte SSL negotiation response (`'S'` or
/// `'N'`), with no length prefix at all.
pub async fn read_ssl_response<R>(reader: &mut R) -> Result<u8, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_u8().await?)
}

/// Read a `len(4) + payload` body whose 4-byte length includes itself but
/// carries no preceding tag byte (startup-phase messages).
pub async fn read_untagged_payload<R>(reader: &mut R) -> Result<Bytes, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    read_len_prefixed_payload(reader).await
}

async fn read_len_prefixed_payload<R>(reader: &mut R) -> Result<Bytes, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let declared = i32::from_be_bytes(len_buf);
    if declared < 4 {
        return Err(ProtocolError::MessageTooLarge(declared.max(0) as usize));
    }
    let body_len = declared as usize - 4;
    if body_len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(body_len));
    }
    let mut body = vec![0u8; body_len];
    reader.read_exact(&mut body).await?;
    Ok(Bytes::from(body))
}

/// Write a tagged frontend message (`Query`, `StartupMessage` response
/// messages like `PasswordMessage`/`SASLResponse`, ...).
pub async fn write_message<W>(writer: &mut W, tag: u8, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(5 + payload.len());
    buf.put_u8(tag);
    buf.put_i32(payload.len() as i32 + 4);
    buf.put_slice(payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Write the `SSLRequest` packet: `len(8) + SSL_REQUEST_CODE`.
pub async fn write_ssl_request<W>(writer: &mut W) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(8);
    buf.put_i32(8);
    buf.put_i32(SSL_REQUEST_CODE);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Build a `StartupMessage`: protocol version followed by
/// NUL-terminated `key\0value\0` pairs and a final empty-string terminator.
pub fn encode_startup_message(params: &[(&str, &str)]) -> Bytes {
    let mut body = BytesMut::new();
    body.put_i32(PROTOCOL_VERSION_3_0);
    for (key, value) in params {
        body.put_slice(key.as_bytes());
        body.put_u8(0);
        body.put_slice(value.as_bytes());
        body.put_u8(0);
    }
    body.put_u8(0);

    let mut framed = BytesMut::with_capacity(body.len() + 4);
    framed.put_i32(body.len() as i32 + 4);
    framed.put_slice(&body);
    framed.freeze()
}

/// Read a NUL-terminated string out of a message payload cursor.
pub fn read_cstr(buf: &mut Bytes) -> Result<String, ProtocolError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(ProtocolError::ConnectionClosed)?;
    let s = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.advance(end + 1);
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_tagged_message() {
        let mut buf = Vec::new();
        write_message(&mut buf, b'Q', b"SELECT 1\0").await.unwrap();
        let mut cursor = &buf[..];
        let msg = read_message(&mut cursor).await.unwrap();
        assert_eq!(msg.tag, b'Q');
        assert_eq!(&msg.payload[..], b"SELECT 1\0");
    }

    #[test]
    fn startup_message_terminates_with_empty_pair() {
        let encoded = encode_startup_message(&[("user", "bob")]);
        assert!(encoded.ends_with(&[0, 0]));
    }

    #[test]
    fn reads_cstr_and_advances() {
        let mut buf = Bytes::from_static(b"hello\0world");
        assert_eq!(read_cstr(&mut buf).unwrap(), "hello");
        assert_eq!(&buf[..], b"world");
    }
}
