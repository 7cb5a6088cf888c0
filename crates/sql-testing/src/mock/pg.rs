//! A scriptable PostgreSQL wire-protocol (v3) mock server.
//!
//! Accepts the startup handshake unauthenticated (always answers
//! `AuthenticationOk`) and answers simple-query (`'Q'`) requests from the
//! shared response table in [`super::MockServerConfig`], using the
//! server's text result format throughout.

use bytes::{BufMut, Bytes, BytesMut};
use pg_protocol::decode::{OID_BOOL, OID_BYTEA, OID_FLOAT4, OID_FLOAT8, OID_INT4, OID_INT8};
use pg_protocol::message::{self, SSL_REQUEST_CODE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use super::{MockColumn, MockResponse, MockServer, MockServerConfig, MockServerError, Result, ScalarKind, ScalarValue, find_response};

/// Builder for [`MockPgServer`].
pub struct MockPgServerBuilder {
    config: MockServerConfig,
}

impl MockPgServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig {
                default_response: Some(MockResponse::empty()),
                server_name: "14.0".to_string(),
                database: "postgres".to_string(),
                ..MockServerConfig::default()
            },
        }
    }

    /// Add a response for a specific SQL query.
    pub fn with_response(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.config.responses.insert(sql.into(), response);
        self
    }

    /// Set the default response for unmatched queries.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.config.default_response = Some(response);
        self
    }

    /// Set the server version string reported in `ParameterStatus`.
    pub fn with_server_name(mut self, version: impl Into<String>) -> Self {
        self.config.server_name = version.into();
        self
    }

    /// Build and start the mock server.
    pub async fn build(self) -> Result<MockPgServer> {
        MockPgServer::start(self.config).await
    }
}

impl Default for MockPgServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A mock PostgreSQL server for testing, simulating enough of a `postgres`
/// instance's startup handshake and simple-query loop to exercise a real
/// client.
pub struct MockPgServer {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    connection_count: Arc<AtomicUsize>,
}

impl MockPgServer {
    /// Create a new builder for the mock server.
    pub fn builder() -> MockPgServerBuilder {
        MockPgServerBuilder::new()
    }

    async fn start(config: MockServerConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let config = Arc::new(config);
        let connection_count = Arc::new(AtomicUsize::new(0));

        let server = Self {
            addr,
            shutdown_tx: shutdown_tx.clone(),
            connection_count: connection_count.clone(),
        };

        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _peer_addr)) => {
                                let config = config.clone();
                                let count = connection_count.clone();
                                count.fetch_add(1, Ordering::SeqCst);
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, config).await {
                                        tracing::debug!("mock PostgreSQL connection error: {e}");
                                    }
                                    count.fetch_sub(1, Ordering::SeqCst);
                                });
                            }
                            Err(e) => {
                                tracing::error!("mock PostgreSQL accept error: {e}");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Ok(server)
    }
}

impl MockServer for MockPgServer {
    fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for MockPgServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn oid_of(kind: ScalarKind) -> u32 {
    match kind {
        ScalarKind::Bool => OID_BOOL,
        ScalarKind::Int => OID_INT4,
        ScalarKind::BigInt => OID_INT8,
        ScalarKind::Float => OID_FLOAT4,
        ScalarKind::Double => OID_FLOAT8,
        ScalarKind::Text => 25,   // OID_TEXT
        ScalarKind::Binary => OID_BYTEA,
    }
}

async fn handle_connection(mut stream: TcpStream, config: Arc<MockServerConfig>) -> Result<()> {
    let mut payload = read_startup_payload(&mut stream).await?;
    if looks_like_ssl_request(&payload) {
        stream.write_u8(b'N').await?;
        stream.flush().await?;
        payload = message::read_untagged_payload(&mut stream)
            .await
            .map_err(|e| MockServerError::Protocol(e.to_string()))?;
    }
    // Body starts with the i32 protocol version; the key/value pairs that
    // follow are irrelevant to a mock server that accepts everyone.
    let _ = payload;

    send_startup_sequence(&mut stream, &config).await?;

    loop {
        let msg = match message::read_message(&mut stream).await {
            Ok(m) => m,
            Err(_) => break,
        };

        match msg.tag {
            b'Q' => {
                let mut body = msg.payload;
                let sql = message::read_cstr(&mut body).unwrap_or_default();
                let response = find_response(&sql, &config);
                send_query_response(&mut stream, response).await?;
            }
            b'X' => break,
            other => {
                tracing::debug!("mock PostgreSQL server: unexpected message tag {other}");
            }
        }
    }

    Ok(())
}

async fn read_startup_payload(stream: &mut TcpStream) -> Result<Bytes> {
    message::read_untagged_payload(stream)
        .await
        .map_err(|e| MockServerError::Protocol(e.to_string()))
}

fn looks_like_ssl_request(payload: &Bytes) -> bool {
    payload.len() == 4 && i32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) == SSL_REQUEST_CODE
}

async fn send_startup_sequence(stream: &mut TcpStream, config: &MockServerConfig) -> Result<()> {
    write_tagged(stream, b'R', &{
        let mut buf = BytesMut::with_capacity(4);
        buf.put_i32(0); // AuthenticationOk
        buf
    })
    .await?;

    write_param_status(stream, "server_version", &config.server_name).await?;
    write_param_status(stream, "client_encoding", "UTF8").await?;

    let mut key_data = BytesMut::with_capacity(8);
    key_data.put_i32(1); // process id
    key_data.put_i32(0); // secret key
    write_tagged(stream, b'K', &key_data).await?;

    write_ready_for_query(stream).await
}

async fn write_param_status(stream: &mut TcpStream, key: &str, value: &str) -> Result<()> {
    let mut buf = BytesMut::with_capacity(key.len() + value.len() + 2);
    buf.put_slice(key.as_bytes());
    buf.put_u8(0);
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    write_tagged(stream, b'S', &buf).await
}

async fn write_ready_for_query(stream: &mut TcpStream) -> Result<()> {
    write_tagged(stream, b'Z', &[b'I']).await
}

async fn write_tagged(stream: &mut TcpStream, tag: u8, payload: &[u8]) -> Result<()> {
    message::write_message(stream, tag, payload)
        .await
        .map_err(|e| MockServerError::Protocol(e.to_string()))
}

async fn send_query_response(stream: &mut TcpStream, response: MockResponse) -> Result<()> {
    match response {
        MockResponse::Scalar(value) => {
            let column = MockColumn::new("", value.kind());
            write_row_description(stream, std::slice::from_ref(&column)).await?;
            write_data_row(stream, std::slice::from_ref(&value)).await?;
            write_command_complete(stream, "SELECT 1").await?;
        }
        MockResponse::Rows { columns, rows } => {
            write_row_description(stream, &columns).await?;
            for row in &rows {
                write_data_row(stream, row).await?;
            }
            write_command_complete(stream, &format!("SELECT {}", rows.len())).await?;
        }
        MockResponse::Error { number, message: msg, .. } => {
            write_error(stream, number, &msg).await?;
            return write_ready_for_query(stream).await;
        }
        MockResponse::RowsAffected(count) => {
            write_command_complete(stream, &format!("UPDATE {count}")).await?;
        }
        MockResponse::Custom(_) => {
            write_command_complete(stream, "SELECT 0").await?;
        }
    }

    write_ready_for_query(stream).await
}

async fn write_row_description(stream: &mut TcpStream, columns: &[MockColumn]) -> Result<()> {
    let mut buf = BytesMut::new();
    buf.put_i16(columns.len() as i16);
    for col in columns {
        buf.put_slice(col.name.as_bytes());
        buf.put_u8(0);
        buf.put_i32(0); // table oid
        buf.put_i16(0); // column attribute number
        buf.put_u32(oid_of(col.kind));
        buf.put_i16(-1); // type length: variable
        buf.put_i32(-1); // type modifier
        buf.put_i16(0); // format: text
    }
    write_tagged(stream, b'T', &buf).await
}

async fn write_data_row(stream: &mut TcpStream, values: &[ScalarValue]) -> Result<()> {
    let mut buf = BytesMut::new();
    buf.put_i16(values.len() as i16);
    for value in values {
        match encode_text(value) {
            Some(text) => {
                buf.put_i32(text.len() as i32);
                buf.put_slice(&text);
            }
            None => buf.put_i32(-1),
        }
    }
    write_tagged(stream, b'D', &buf).await
}

fn encode_text(value: &ScalarValue) -> Option<Vec<u8>> {
    match value {
        ScalarValue::Binary(data) => Some(format!("\\x{}", hex(data)).into_bytes()),
        other => other.as_text().map(String::into_bytes),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

async fn write_command_complete(stream: &mut TcpStream, tag: &str) -> Result<()> {
    let mut buf = BytesMut::with_capacity(tag.len() + 1);
    buf.put_slice(tag.as_bytes());
    buf.put_u8(0);
    write_tagged(stream, b'C', &buf).await
}

async fn write_error(stream: &mut TcpStream, code: i32, message: &str) -> Result<()> {
    let mut buf = BytesMut::new();
    buf.put_u8(b'S');
    buf.put_slice(b"ERROR\0");
    buf.put_u8(b'C');
    buf.put_slice(format!("{code:05}\0").as_bytes());
    buf.put_u8(b'M');
    buf.put_slice(message.as_bytes());
    buf.put_u8(0);
    buf.put_u8(0); // terminator
    write_tagged(stream, b'E', &buf).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn server_starts_and_reports_its_address() {
        let server = MockPgServer::builder().with_server_name("15.2").build().await.unwrap();
        assert!(server.port() > 0);
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn oid_mapping_covers_every_scalar_kind() {
        assert_eq!(oid_of(ScalarKind::Int), OID_INT4);
        assert_eq!(oid_of(ScalarKind::BigInt), OID_INT8);
        assert_eq!(oid_of(ScalarKind::Bool), OID_BOOL);
    }

    #[test]
    fn null_encodes_to_no_text() {
        assert_eq!(encode_text(&ScalarValue::Null), None);
    }

    #[test]
    fn binary_encodes_as_pg_hex_bytea() {
        let encoded = encode_text(&ScalarValue::Binary(vec![0xDE, 0xAD])).unwrap();
        assert_eq!(encoded, b"\\xdead");
    }
}
