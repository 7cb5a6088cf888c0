//! The MySQL/MariaDB engine: TCP connect, optional TLS upgrade, handshake
//! and authentication, and the `COM_QUERY` text-protocol request/response
//! loop.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes};
use sql_core::{ResultBatch, ResultSet, SqlColumn, SqlParameter, SqlRow};
use sql_tls::{TlsConfig, TlsConnector};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::auth::{
    caching_sha2_password, mysql_native_password, FAST_AUTH_FULL_AUTH_REQUIRED,
    FAST_AUTH_SUCCESS,
};
use crate::error::ProtocolError;
use crate::handshake::{
    default_client_capabilities, encode_handshake_response, encode_ssl_request,
    parse_handshake_v10, Capabilities, HandshakeV10,
};
use crate::packet::{read_packet, write_packet};
use wire_framing::lenenc::read_lenenc_int;
use wire_framing::text::read_null_terminated_utf8;

const STATUS_MORE_RESULTS_EXISTS: u16 = 0x0008;

/// How a connection negotiates TLS before the authentication handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Never attempt TLS.
    Disable,
    /// Try TLS; fall back to cleartext if the server doesn't advertise it.
    Prefer,
    /// Require TLS; fail the connection if the server doesn't advertise it.
    Require,
}

/// Connection parameters for the MySQL engine.
#[derive(Debug, Clone)]
pub struct MysqlConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port (default `3306`).
    pub port: u16,
    /// Database name to select on connect.
    pub database: String,
    /// Username presented in `HandshakeResponse41`.
    pub username: String,
    /// Password used for `mysql_native_password`/`caching_sha2_password`.
    pub password: String,
    /// TLS negotiation policy.
    pub tls_mode: TlsMode,
    /// Skip server certificate validation (insecure).
    pub trust_server_certificate: bool,
    /// Timeout for the initial TCP connect.
    pub connect_timeout: Duration,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3306,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            tls_mode: TlsMode::Prefer,
            trust_server_certificate: false,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => std::pin::Pin::new(s).poll_flush(cx),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            Stream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// An established MySQL connection, past handshake and authentication.
pub struct MysqlConnection {
    stream: Stream,
    capabilities: Capabilities,
    /// Server version string reported in the handshake.
    pub server_version: String,
}

impl MysqlConnection {
    /// Connect, negotiate TLS per `config.tls_mode`, and complete the
    /// handshake/authentication exchange.
    pub async fn connect(config: &MysqlConfig) -> Result<Self, ProtocolError> {
        let mut tcp = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| {
            ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connect timed out",
            ))
        })??;
        tcp.set_nodelay(true).ok();

        let (seq, payload) = read_packet(&mut tcp).await?;
        let _ = seq;
        let greeting = parse_handshake_v10(payload)?;

        let client_caps = default_client_capabilities();
        let wants_tls = config.tls_mode != TlsMode::Disable;
        if wants_tls && !greeting.capabilities.contains(Capabilities::SSL) {
            if config.tls_mode == TlsMode::Require {
                return Err(ProtocolError::Server {
                    code: 0,
                    sql_state: None,
                    message: "server does not support TLS but TlsMode::Require was set".into(),
                });
            }
        }

        let use_tls = wants_tls && greeting.capabilities.contains(Capabilities::SSL);
        let mut stream = Stream::Plain(tcp);
        let mut next_seq = 1u8;

        if use_tls {
            let Stream::Plain(mut tcp) = stream else {
                unreachable!()
            };
            let ssl_request = encode_ssl_request(client_caps, greeting.character_set);
            next_seq = write_packet(&mut tcp, next_seq, &ssl_request).await?;

            let tls_config = TlsConfig {
                trust_server_certificate: config.trust_server_certificate,
                ..Default::default()
            };
            let connector = TlsConnector::new(tls_config)?;
            let tls_stream = connector.connect(tcp, &config.host).await?;
            stream = Stream::Tls(Box::new(tls_stream));
        }

        let mut conn = Self {
            stream,
            capabilities: client_caps,
            server_version: greeting.server_version.clone(),
        };
        conn.authenticate(config, &greeting, next_seq).await?;
        Ok(conn)
    }

    async fn authenticate(
        &mut self,
        config: &MysqlConfig,
        greeting: &HandshakeV10,
        mut seq: u8,
    ) -> Result<(), ProtocolError> {
        let plugin = if greeting.auth_plugin_name.is_empty() {
            "mysql_native_password"
        } else {
            greeting.auth_plugin_name.as_str()
        };
        let auth_response = compute_auth_response(plugin, &config.password, &greeting.auth_plugin_data)?;

        let database = if config.database.is_empty() {
            None
        } else {
            Some(config.database.as_str())
        };
        let response = encode_handshake_response(
            self.capabilities,
            greeting.character_set,
            &config.username,
            &auth_response,
            plugin,
            database,
        );
        seq = write_packet(&mut self.stream, seq, &response).await?;

        loop {
            let (resp_seq, payload) = read_packet(&mut self.stream).await?;
            seq = resp_seq.wrapping_add(1);
            if payload.is_empty() {
                continue;
            }
            match payload[0] {
                0x00 => return Ok(()), // OK
                0xFF => return Err(parse_err_packet(payload)),
                0xFE if payload.len() > 1 => {
                    // AuthSwitchRequest
                    let mut cursor = payload.slice(1..);
                    let plugin_name = read_null_terminated_utf8(&mut cursor)?;
                    let scramble = cursor.to_vec();
                    let response = compute_auth_response(&plugin_name, &config.password, &scramble)?;
                    seq = write_packet(&mut self.stream, seq, &response).await?;
                }
                0x01 if payload.len() > 1 => {
                    // caching_sha2_password fast-auth result
                    match payload[1] {
                        FAST_AUTH_SUCCESS => {}
                        FAST_AUTH_FULL_AUTH_REQUIRED => {
                            if !matches!(self.stream, Stream::Tls(_)) {
                                return Err(ProtocolError::FullAuthRequiresTls);
                            }
                            let mut password = config.password.clone().into_bytes();
                            password.push(0);
                            seq = write_packet(&mut self.stream, seq, &password).await?;
                        }
                        other => {
                            return Err(ProtocolError::UnsupportedAuthPlugin(format!(
                                "unknown caching_sha2_password result byte {other:#x}"
                            )))
                        }
                    }
                }
                _ => {
                    return Err(ProtocolError::Server {
                        code: 0,
                        sql_state: None,
                        message: "unexpected packet during authentication".into(),
                    })
                }
            }
        }
    }

    /// Run one or more `;`-separated statements in a single `COM_QUERY`
    /// round trip, collecting every result set the server produces.
    pub async fn query_multi(
        &mut self,
        sql: &str,
        params: &[SqlParameter],
    ) -> Result<ResultBatch, ProtocolError> {
        let rewritten = crate::query::substitute_placeholders(sql, params)?;
        let mut body = Vec::with_capacity(rewritten.len() + 1);
        body.push(0x03); // COM_QUERY
        body.extend_from_slice(rewritten.as_bytes());
        write_packet(&mut self.stream, 0, &body).await?;

        let mut batch = ResultBatch::default();
        loop {
            let more = self.read_one_result_set(&mut batch).await?;
            if !more {
                break;
            }
        }
        Ok(batch)
    }

    /// Convenience wrapper returning only the outcome of the first
    /// statement.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[SqlParameter],
    ) -> Result<ResultBatch, ProtocolError> {
        self.query_multi(sql, params).await
    }

    /// Reads one result set (or one OK/ERR outcome). Returns `true` if the
    /// server's status flags announce more result sets are coming.
    async fn read_one_result_set(&mut self, batch: &mut ResultBatch) -> Result<bool, ProtocolError> {
        let (_, first) = read_packet(&mut self.stream).await?;
        if first.is_empty() {
            return Ok(false);
        }
        match first[0] {
            0x00 => {
                let (rows_affected, status) = parse_ok_packet(first)?;
                batch.sets.push(ResultSet {
                    rows: Vec::new(),
                    rows_affected: Some(rows_affected),
                });
                return Ok(status & STATUS_MORE_RESULTS_EXISTS != 0);
            }
            0xFF => return Err(parse_err_packet(first)),
            _ => {}
        }

        let mut cursor = first;
        let column_count = read_lenenc_int(&mut cursor)?.unwrap_or(0) as usize;

        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            let (_, payload) = read_packet(&mut self.stream).await?;
            columns.push(parse_column_definition(payload)?);
        }

        if !self.capabilities.contains(Capabilities::DEPRECATE_EOF) {
            let (_, _eof) = read_packet(&mut self.stream).await?;
        }

        let columns = Arc::new(columns);
        let mut rows = Vec::new();
        let status;
        loop {
            let (_, payload) = read_packet(&mut self.stream).await?;
            if payload.first() == Some(&0xFE) && payload.len() < 9 {
                status = u16::from_le_bytes([
                    *payload.get(3).unwrap_or(&0),
                    *payload.get(4).unwrap_or(&0),
                ]);
                break;
            }
            if payload.first() == Some(&0x00) && self.capabilities.contains(Capabilities::DEPRECATE_EOF)
            {
                let (_, s) = parse_ok_packet(payload)?;
                status = s;
                break;
            }
            if payload.first() == Some(&0xFF) {
                return Err(parse_err_packet(payload));
            }
            rows.push(parse_row(Arc::clone(&columns), payload)?);
        }

        batch.sets.push(ResultSet {
            rows,
            rows_affected: None,
        });
        Ok(status & STATUS_MORE_RESULTS_EXISTS != 0)
    }

    /// Close the connection by sending `COM_QUIT`.
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        write_packet(&mut self.stream, 0, &[0x01]).await?;
        Ok(())
    }
}

fn compute_auth_response(
    plugin: &str,
    password: &str,
    scramble: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    match plugin {
        "mysql_native_password" => Ok(mysql_native_password(password, scramble)),
        "caching_sha2_password" => Ok(caching_sha2_password(password, scramble)),
        other => Err(ProtocolError::UnsupportedAuthPlugin(other.to_owned())),
    }
}

fn parse_column_definition(mut payload: Bytes) -> Result<SqlColumn, ProtocolError> {
    let _catalog = wire_framing::lenenc::read_lenenc_string(&mut payload)?;
    let _schema = wire_framing::lenenc::read_lenenc_string(&mut payload)?;
    let table = wire_framing::lenenc::read_lenenc_string(&mut payload)?;
    let _org_table = wire_framing::lenenc::read_lenenc_string(&mut payload)?;
    let name = wire_framing::lenenc::read_lenenc_string(&mut payload)?
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();
    let _org_name = wire_framing::lenenc::read_lenenc_string(&mut payload)?;
    let _fixed_len = wire_framing::lenenc::read_lenenc_int(&mut payload)?;
    let charset = payload.get_u16_le();
    let _column_length = payload.get_u32_le();
    let column_type = payload.get_u8();
    let flags = payload.get_u16_le();
    let _decimals = payload.get_u8();

    let not_null = flags & 0x0001 != 0;
    let mut column = SqlColumn::new(name, ((charset as u32) << 8) | column_type as u32, !not_null);
    if let Some(table) = table {
        column = column.with_table_name(String::from_utf8_lossy(&table).into_owned());
    }
    Ok(column)
}

fn parse_row(columns: Arc<Vec<SqlColumn>>, mut payload: Bytes) -> Result<SqlRow, ProtocolError> {
    let mut values = Vec::with_capacity(columns.len());
    for column in columns.iter() {
        let field = wire_framing::lenenc::read_lenenc_string(&mut payload)?;
        let column_type = (column.type_id & 0xFF) as u8;
        let charset = (column.type_id >> 8) as u16;
        values.push(crate::decode::decode_text_value(
            column_type,
            charset,
            field.as_deref(),
        )?);
    }
    Ok(SqlRow::new(columns, values))
}

/// Returns `(affected_rows, status_flags)`.
fn parse_ok_packet(mut payload: Bytes) -> Result<(u64, u16), ProtocolError> {
    payload.advance(1); // header
    let affected_rows = read_lenenc_int(&mut payload)?.unwrap_or(0);
    let _last_insert_id = read_lenenc_int(&mut payload)?;
    let status = if payload.remaining() >= 2 {
        payload.get_u16_le()
    } else {
        0
    };
    Ok((affected_rows, status))
}

fn parse_err_packet(mut payload: Bytes) -> ProtocolError {
    if payload.remaining() < 3 {
        return ProtocolError::Server {
            code: 0,
            sql_state: None,
            message: "malformed ERR_Packet".into(),
        };
    }
    payload.advance(1); // header
    let code = payload.get_u16_le();
    let sql_state = if payload.first() == Some(&b'#') && payload.remaining() >= 6 {
        payload.advance(1);
        let state = payload.split_to(5);
        Some(String::from_utf8_lossy(&state).into_owned())
    } else {
        None
    };
    let message = String::from_utf8_lossy(&payload).into_owned();
    ProtocolError::Server {
        code,
        sql_state,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn err_packet_parses_sqlstate() {
        let mut payload = Vec::new();
        payload.push(0xFF);
        payload.extend_from_slice(&1045u16.to_le_bytes());
        payload.push(b'#');
        payload.extend_from_slice(b"28000");
        payload.extend_from_slice(b"Access denied");
        let err = parse_err_packet(Bytes::from(payload));
        match err {
            ProtocolError::Server { code, sql_state, message } => {
                assert_eq!(code, 1045);
                assert_eq!(sql_state.as_deref(), Some("28000"));
                assert_eq!(message, "Access denied");
            }
            _ => panic!("expected Server error"),
        }
    }
}
