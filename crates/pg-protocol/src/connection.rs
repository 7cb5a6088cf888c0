//! The PostgreSQL engine: TCP connect, optional TLS upgrade, startup and
//! authentication, and the simple-query request/response loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Buf;
use sql_core::{ResultBatch, ResultSet, SqlColumn, SqlParameter, SqlRow};
use sql_tls::{TlsConfig, TlsConnector};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::auth::{md5_password_response, ScramClient};
use crate::error::ProtocolError;
use crate::message::{
    encode_startup_message, read_cstr, read_message, read_ssl_response, write_message,
    write_ssl_request, BackendMessage,
};
use crate::query::substitute_placeholders;

/// How a connection negotiates TLS before the startup handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Never attempt TLS.
    Disable,
    /// Try TLS; fall back to cleartext if the server declines.
    Prefer,
    /// Require TLS; fail the connection if the server declines.
    Require,
}

/// Connection parameters for the PostgreSQL engine.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port (default `5432`).
    pub port: u16,
    /// Database name to select on connect.
    pub database: String,
    /// Username presented in the startup message.
    pub username: String,
    /// Password used for MD5/SCRAM authentication.
    pub password: String,
    /// TLS negotiation policy.
    pub tls_mode: TlsMode,
    /// Skip server certificate validation (insecure; for `TrustServerCertificate`-style opt-outs).
    pub trust_server_certificate: bool,
    /// Timeout for the initial TCP connect.
    pub connect_timeout: Duration,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5432,
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

/// An established PostgreSQL connection, past startup and authentication.
pub struct PgConnection {
    stream: Stream,
    /// Server parameters reported via `ParameterStatus` (`server_version`, `client_encoding`, ...).
    pub parameters: HashMap<String, String>,
    /// The backend process id and secret key, for a future `CancelRequest`.
    pub backend_key: Option<(i32, i32)>,
}

impl PgConnection {
    /// Connect, negotiate TLS per `config.tls_mode`, and complete the
    /// startup/authentication handshake.
    pub async fn connect(config: &PgConfig) -> Result<Self, ProtocolError> {
        let tcp = tokio::time::timeout(
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

        let mut stream = Stream::Plain(tcp);

        if config.tls_mode != TlsMode::Disable {
            stream = Self::negotiate_tls(stream, config).await?;
        }

        let mut conn = Self {
            stream,
            parameters: HashMap::new(),
            backend_key: None,
        };
        conn.startup(config).await?;
        Ok(conn)
    }

    async fn negotiate_tls(stream: Stream, config: &PgConfig) -> Result<Stream, ProtocolError> {
        let Stream::Plain(mut tcp) = stream else {
            return Ok(stream);
        };
        write_ssl_request(&mut tcp).await?;
        let response = read_ssl_response(&mut tcp).await?;
        if response != b'S' {
            if config.tls_mode == TlsMode::Require {
                return Err(ProtocolError::Scram(
                    "server declined TLS but TlsMode::Require was set".into(),
                ));
            }
            return Ok(Stream::Plain(tcp));
        }

        let tls_config = TlsConfig {
            trust_server_certificate: config.trust_server_certificate,
            ..Default::default()
        };
        let connector = TlsConnector::new(tls_config)?;
        let tls_stream = connector.connect(tcp, &config.host).await?;
        Ok(Stream::Tls(Box::new(tls_stream)))
    }

    async fn startup(&mut self, config: &PgConfig) -> Result<(), ProtocolError> {
        let params = [
            ("user", config.username.as_str()),
            ("database", config.database.as_str()),
            ("client_encoding", "UTF8"),
        ];
        let startup = encode_startup_message(&params);
        self.stream.write_all(&startup).await?;
        self.stream.flush().await?;

        loop {
            let msg = read_message(&mut self.stream).await?;
            match msg.tag {
                b'R' => {
                    if self.handle_authentication(msg.payload, config).await? {
                        continue;
                    }
                }
                b'S' => self.handle_parameter_status(msg.payload)?,
                b'K' => self.handle_backend_key_data(msg.payload)?,
                b'Z' => return Ok(()),
                b'E' => return Err(parse_error_response(msg.payload)),
                b'N' => {}
                other => return Err(ProtocolError::UnknownMessageType(other)),
            }
        }
    }

    /// Returns `Ok(true)` if more `Authentication` messages are expected
    /// (i.e. this one was part of a multi-step SASL exchange).
    async fn handle_authentication(
        &mut self,
        mut payload: bytes::Bytes,
        config: &PgConfig,
    ) -> Result<bool, ProtocolError> {
        let code = payload.get_i32();
        match code {
            0 => Ok(false), // AuthenticationOk
            3 => {
                // AuthenticationCleartextPassword
                write_message(&mut self.stream, b'p', config.password.as_bytes()).await?;
                write_terminator(&mut self.stream).await?;
                Ok(true)
            }
            5 => {
                // AuthenticationMD5Password: 4-byte salt follows
                let mut salt = [0u8; 4];
                payload.copy_to_slice(&mut salt);
                let response =
                    md5_password_response(&config.username, &config.password, salt);
                let mut body = response.into_bytes();
                body.push(0);
                write_message(&mut self.stream, b'p', &body).await?;
                Ok(true)
            }
            10 => {
                // AuthenticationSASL: list of mechanism names
                self.run_scram(&config.password).await?;
                Ok(true)
            }
            11 | 12 => Ok(true), // SASLContinue/SASLFinal handled inside run_scram
            other => Err(ProtocolError::UnsupportedAuth(other)),
        }
    }

    async fn run_scram(&mut self, password: &str) -> Result<(), ProtocolError> {
        let mut scram = ScramClient::new(password);
        let client_first = scram.client_first_message();

        let mut body = Vec::new();
        body.extend_from_slice(b"SCRAM-SHA-256");
        body.push(0);
        body.extend_from_slice(&(client_first.len() as i32).to_be_bytes());
        body.extend_from_slice(client_first.as_bytes());
        write_message(&mut self.stream, b'p', &body).await?;

        let continue_msg = read_message(&mut self.stream).await?;
        if continue_msg.tag != b'R' {
            return Err(ProtocolError::UnknownMessageType(continue_msg.tag));
        }
        let mut payload = continue_msg.payload;
        let code = payload.get_i32();
        if code != 11 {
            return Err(ProtocolError::Scram(format!(
                "expected SASLContinue (11), got auth code {code}"
            )));
        }
        let server_first = std::str::from_utf8(&payload)
            .map_err(|e| ProtocolError::Scram(e.to_string()))?
            .to_owned();
        let client_final = scram.client_final_message(&server_first)?;
        write_message(&mut self.stream, b'p', client_final.as_bytes()).await?;

        let final_msg = read_message(&mut self.stream).await?;
        if final_msg.tag != b'R' {
            return Err(ProtocolError::UnknownMessageType(final_msg.tag));
        }
        let mut payload = final_msg.payload;
        let code = payload.get_i32();
        if code != 12 {
            return Err(ProtocolError::Scram(format!(
                "expected SASLFinal (12), got auth code {code}"
            )));
        }
        let server_final = std::str::from_utf8(&payload)
            .map_err(|e| ProtocolError::Scram(e.to_string()))?
            .to_owned();
        scram.verify_server_final(&server_final)?;
        Ok(())
    }

    fn handle_parameter_status(&mut self, mut payload: bytes::Bytes) -> Result<(), ProtocolError> {
        let name = read_cstr(&mut payload)?;
        let value = read_cstr(&mut payload)?;
        self.parameters.insert(name, value);
        Ok(())
    }

    fn handle_backend_key_data(&mut self, mut payload: bytes::Bytes) -> Result<(), ProtocolError> {
        let pid = payload.get_i32();
        let secret = payload.get_i32();
        self.backend_key = Some((pid, secret));
        Ok(())
    }

    /// Run one statement. Convenience wrapper over [`PgConnection::query_multi`]
    /// that returns only the first result set.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[SqlParameter],
    ) -> Result<ResultBatch, ProtocolError> {
        self.query_multi(sql, params).await
    }

    /// Run one or more `;`-separated statements in a single simple-query
    /// round trip, collecting every result set the server produces before
    /// the terminating `ReadyForQuery`.
    pub async fn query_multi(
        &mut self,
        sql: &str,
        params: &[SqlParameter],
    ) -> Result<ResultBatch, ProtocolError> {
        let rewritten = substitute_placeholders(sql, params)?;
        let mut body = rewritten.into_bytes();
        body.push(0);
        write_message(&mut self.stream, b'Q', &body).await?;

        let mut batch = ResultBatch::default();
        let mut columns: Option<Arc<Vec<SqlColumn>>> = None;
        let mut rows: Vec<SqlRow> = Vec::new();

        loop {
            let msg = read_message(&mut self.stream).await?;
            match msg.tag {
                b'T' => {
                    columns = Some(Arc::new(parse_row_description(msg.payload)?));
                }
                b'D' => {
                    let cols = columns
                        .clone()
                        .ok_or_else(|| ProtocolError::Scram("DataRow before RowDescription".into()))?;
                    rows.push(parse_data_row(cols, msg.payload)?);
                }
                b'C' => {
                    let tag = read_command_tag(msg.payload)?;
                    batch.sets.push(ResultSet {
                        rows: std::mem::take(&mut rows),
                        rows_affected: parse_rows_affected(&tag),
                    });
                    columns = None;
                }
                b'I' => {
                    batch.sets.push(ResultSet::default());
                }
                b'N' => {
                    let mut payload = msg.payload;
                    if let Some((_, text)) = parse_notice_fields(&mut payload) {
                        batch.info_messages.push(text);
                    }
                }
                b'S' => self.handle_parameter_status(msg.payload)?,
                b'Z' => return Ok(batch),
                b'E' => return Err(parse_error_response(msg.payload)),
                other => return Err(ProtocolError::UnknownMessageType(other)),
            }
        }
    }

    /// Close the connection by sending the `Terminate` message.
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        write_message(&mut self.stream, b'X', &[]).await
    }
}

async fn write_terminator<W: AsyncWrite + Unpin>(stream: &mut W) -> Result<(), ProtocolError> {
    stream.write_u8(0).await?;
    Ok(())
}

fn parse_row_description(mut payload: bytes::Bytes) -> Result<Vec<SqlColumn>, ProtocolError> {
    let count = payload.get_i16() as usize;
    let mut columns = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_cstr(&mut payload)?;
        let _table_oid = payload.get_i32();
        let _attr_num = payload.get_i16();
        let type_oid = payload.get_i32() as u32;
        let _type_len = payload.get_i16();
        let _type_mod = payload.get_i32();
        let _format = payload.get_i16();
        columns.push(SqlColumn::new(name, type_oid, true));
    }
    Ok(columns)
}

fn parse_data_row(
    columns: Arc<Vec<SqlColumn>>,
    mut payload: bytes::Bytes,
) -> Result<SqlRow, ProtocolError> {
    let count = payload.get_i16() as usize;
    let mut values = Vec::with_capacity(count);
    for column in columns.iter().take(count) {
        let len = payload.get_i32();
        let field = if len < 0 {
            None
        } else {
            let bytes = payload.split_to(len as usize);
            Some(bytes)
        };
        values.push(crate::decode::decode_text_value(
            column.type_id,
            field.as_deref(),
        )?);
    }
    Ok(SqlRow::new(columns, values))
}

fn read_command_tag(mut payload: bytes::Bytes) -> Result<String, ProtocolError> {
    read_cstr(&mut payload)
}

/// Parse the row count out of a `CommandComplete` tag like `"UPDATE 3"` or
/// `"SELECT 10"`.
fn parse_rows_affected(tag: &str) -> Option<u64> {
    tag.rsplit(' ').next()?.parse().ok()
}

fn parse_notice_fields(payload: &mut bytes::Bytes) -> Option<(char, String)> {
    let mut message = None;
    while payload.has_remaining() {
        let field_type = payload.get_u8();
        if field_type == 0 {
            break;
        }
        let text = read_cstr(payload).ok()?;
        if field_type == b'M' {
            message = Some(text);
        }
    }
    message.map(|m| ('N', m))
}

fn parse_error_response(mut payload: bytes::Bytes) -> ProtocolError {
    let mut code = String::new();
    let mut message = String::new();
    while payload.has_remaining() {
        let field_type = payload.get_u8();
        if field_type == 0 {
            break;
        }
        let Ok(text) = read_cstr(&mut payload) else {
            break;
        };
        match field_type {
            b'C' => code = text,
            b'M' => message = text,
            _ => {}
        }
    }
    ProtocolError::Server { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_affected_from_command_tag() {
        assert_eq!(parse_rows_affected("UPDATE 3"), Some(3));
        assert_eq!(parse_rows_affected("SELECT 10"), Some(10));
        assert_eq!(parse_rows_affected("BEGIN"), "BEGIN".parse::<u64>().ok());
    }
}
