//! `HandshakeV10` parsing, capability-flag negotiation, and
//! `HandshakeResponse41` encoding.

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use wire_framing::text::read_null_terminated_utf8;

bitflags! {
    /// Client/server capability flags negotiated during the handshake.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// Use the improved version of Old Password Authentication.
        const LONG_PASSWORD = 0x0000_0001;
        /// Can specify a database on connect.
        const CONNECT_WITH_DB = 0x0000_0008;
        /// Supports SSL.
        const SSL = 0x0000_0800;
        /// Supports the 4.1 protocol.
        const PROTOCOL_41 = 0x0000_0200;
        /// Supports the 4.1 authentication hashing (`mysql_native_password`).
        const SECURE_CONNECTION = 0x0000_8000;
        /// Can handle multiple statements per `COM_QUERY`.
        const MULTI_STATEMENTS = 0x0001_0000;
        /// Can handle multiple result sets for a single query.
        const MULTI_RESULTS = 0x0002_0000;
        /// Supports plugin authentication.
        const PLUGIN_AUTH = 0x0008_0000;
        /// Auth response data is length-encoded rather than null-terminated.
        const PLUGIN_AUTH_LENENC_CLIENT_DATA = 0x0020_0000;
        /// The final EOF packet after a result set is omitted.
        const DEPRECATE_EOF = 0x0100_0000;
    }
}

/// The capability set this engine always requests.
#[must_use]
pub fn default_client_capabilities() -> Capabilities {
    Capabilities::LONG_PASSWORD
        | Capabilities::PROTOCOL_41
        | Capabilities::SECURE_CONNECTION
        | Capabilities::PLUGIN_AUTH
        | Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA
        | Capabilities::MULTI_STATEMENTS
        | Capabilities::MULTI_RESULTS
        | Capabilities::DEPRECATE_EOF
}

/// The server's initial greeting.
#[derive(Debug, Clone)]
pub struct HandshakeV10 {
    /// Protocol version (`10`).
    pub protocol_version: u8,
    /// Server version string, e.g. `"8.0.35"`.
    pub server_version: String,
    /// Connection id assigned by the server.
    pub connection_id: u32,
    /// Full auth-plugin challenge data (scramble), reassembled from both parts.
    pub auth_plugin_data: Vec<u8>,
    /// Server capability flags.
    pub capabilities: Capabilities,
    /// Default server character set id.
    pub character_set: u8,
    /// Name of the auth plugin the server wants the client to use.
    pub auth_plugin_name: String,
}

/// Parse the server's `HandshakeV10` greeting packet.
pub fn parse_handshake_v10(mut payload: Bytes) -> Result<HandshakeV10, ProtocolError> {
    let protocol_version = payload.get_u8();
    let server_version = read_null_terminated_utf8(&mut payload)?;
    let connection_id = payload.get_u32_le();

    let mut scramble = Vec::with_capacity(20);
    scramble.extend_from_slice(&payload.split_to(8));
    payload.advance(1); // filler

    let caps_lower = payload.get_u16_le();
    let character_set = payload.get_u8();
    let _status_flags = payload.get_u16_le();
    let caps_upper = payload.get_u16_le();
    let capabilities =
        Capabilities::from_bits_truncate((caps_lower as u32) | ((caps_upper as u32) << 16));

    let auth_plugin_data_len = payload.get_u8();
    payload.advance(10); // reserved

    if capabilities.contains(Capabilities::SECURE_CONNECTION) {
        let remaining_len = (auth_plugin_data_len as usize).saturating_sub(8).max(13);
        let part2_len = remaining_len.min(payload.remaining());
        scramble.extend_from_slice(&payload.split_to(part2_len));
        if scramble.last() == Some(&0) {
            scramble.pop();
        }
    }

    let auth_plugin_name = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
        read_null_terminated_utf8(&mut payload).unwrap_or_default()
    } else {
        String::new()
    };

    Ok(HandshakeV10 {
        protocol_version,
        server_version,
        connection_id,
        auth_plugin_data: scramble,
        capabilities,
        character_set,
        auth_plugin_name,
    })
}

/// Build the `SSLRequest` packet sent in place of `HandshakeResponse41`
/// when upgrading to TLS mid-handshake.
#[must_use]
pub fn encode_ssl_request(capabilities: Capabilities, character_set: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(32);
    buf.put_u32_le((capabilities | Capabilities::SSL).bits());
    buf.put_u32_le(0x1000_0000); // max packet size
    buf.put_u8(character_set);
    buf.put_bytes(0, 23);
    buf.freeze()
}

/// Build the `HandshakeResponse41` packet.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn encode_handshake_response(
    capabilities: Capabilities,
    character_set: u8,
    username: &str,
    auth_response: &[u8],
    auth_plugin_name: &str,
    database: Option<&str>,
) -> Bytes {
    let mut buf = BytesMut::with_capacity(64 + username.len() + auth_response.len());
    buf.put_u32_le(capabilities.bits());
    buf.put_u32_le(0x1000_0000);
    buf.put_u8(character_set);
    buf.put_bytes(0, 23);
    buf.put_slice(username.as_bytes());
    buf.put_u8(0);

    wire_framing::lenenc::write_lenenc_string(&mut buf, auth_response);

    if let Some(db) = database {
        buf.put_slice(db.as_bytes());
        buf.put_u8(0);
    }

    buf.put_slice(auth_plugin_name.as_bytes());
    buf.put_u8(0);

    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capabilities_include_protocol_41() {
        assert!(default_client_capabilities().contains(Capabilities::PROTOCOL_41));
    }

    #[test]
    fn encode_handshake_response_contains_username() {
        let encoded = encode_handshake_response(
            default_client_capabilities(),
            33,
            "root",
            b"token",
            "mysql_native_password",
            Some("test"),
        );
        assert!(encoded.windows(4).any(|w| w == b"root"));
    }
}
