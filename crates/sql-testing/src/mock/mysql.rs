//! A scriptable MySQL/MariaDB wire-protocol mock server.
//!
//! Greets with a fixed `mysql_native_password` `HandshakeV10` and accepts
//! any `HandshakeResponse41` unconditionally, then answers `COM_QUERY`
//! requests from the shared response table in [`super::MockServerConfig`].
//! Rows are always terminated with an OK packet rather than a legacy EOF,
//! since every client this crate ships requests `CLIENT_DEPRECATE_EOF`.

use bytes::{BufMut, Bytes, BytesMut};
use mysql_protocol::decode::{
    TYPE_DOUBLE, TYPE_FLOAT, TYPE_LONG, TYPE_LONGLONG, TYPE_TINY, TYPE_VAR_STRING,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use wire_framing::lenenc::{write_lenenc_int, write_lenenc_string};

use super::{MockColumn, MockResponse, MockServer, MockServerConfig, MockServerError, Result, ScalarKind, ScalarValue, find_response};

const UTF8MB4_GENERAL_CI: u16 = 45;

/// Builder for [`MockMySqlServer`].
pub struct MockMySqlServerBuilder {
    config: MockServerConfig,
}

impl MockMySqlServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig {
                default_response: Some(MockResponse::empty()),
                server_name: "8.0.35-mock".to_string(),
                database: "test".to_string(),
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

    /// Set the server version string reported in the greeting.
    pub fn with_server_name(mut self, version: impl Into<String>) -> Self {
        self.config.server_name = version.into();
        self
    }

    /// Build and start the mock server.
    pub async fn build(self) -> Result<MockMySqlServer> {
        MockMySqlServer::start(self.config).await
    }
}

impl Default for MockMySqlServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A mock MySQL/MariaDB server for testing, simulating enough of a real
/// server's handshake and `COM_QUERY` loop to exercise a real client.
pub struct MockMySqlServer {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    connection_count: Arc<AtomicUsize>,
}

impl MockMySqlServer {
    /// Create a new builder for the mock server.
    pub fn builder() -> MockMySqlServerBuilder {
        MockMySqlServerBuilder::new()
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
                                        tracing::debug!("mock MySQL connection error: {e}");
                                    }
                                    count.fetch_sub(1, Ordering::SeqCst);
                                });
                            }
                            Err(e) => {
                                tracing::error!("mock MySQL accept error: {e}");
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

impl MockServer for MockMySqlServer {
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

impl Drop for MockMySqlServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn column_type_of(kind: ScalarKind) -> u8 {
    match kind {
        ScalarKind::Bool => TYPE_TINY,
        ScalarKind::Int => TYPE_LONG,
        ScalarKind::BigInt => TYPE_LONGLONG,
        ScalarKind::Float => TYPE_FLOAT,
        ScalarKind::Double => TYPE_DOUBLE,
        ScalarKind::Text | ScalarKind::Binary => TYPE_VAR_STRING,
    }
}

async fn handle_connection(mut stream: TcpStream, config: Arc<MockServerConfig>) -> Result<()> {
    let seq = send_handshake(&mut stream, &config).await?;

    let (client_seq, _response) = mysql_protocol::packet::read_packet(&mut stream)
        .await
        .map_err(|e| MockServerError::Protocol(e.to_string()))?;
    let mut seq = client_seq.wrapping_add(1).max(seq);
    seq = send_ok(&mut stream, seq, 0, 0).await?;

    loop {
        let (_, payload) = match mysql_protocol::packet::read_packet(&mut stream).await {
            Ok(p) => p,
            Err(_) => break,
        };
        seq = 0; // MySQL restarts the sequence counter on every new command.

        match payload.first() {
            Some(0x03) => {
                let sql = String::from_utf8_lossy(&payload[1..]).into_owned();
                let response = find_response(&sql, &config);
                seq = send_query_response(&mut stream, seq, response).await?;
            }
            Some(0x01) => break, // COM_QUIT
            _ => {
                seq = send_ok(&mut stream, seq, 0, 0).await?;
            }
        }
    }

    let _ = seq;
    Ok(())
}

async fn send_handshake(stream: &mut TcpStream, config: &MockServerConfig) -> Result<u8> {
    let scramble: [u8; 20] = *b"01234567890123456789";

    let mut payload = BytesMut::new();
    payload.put_u8(10); // protocol version
    payload.put_slice(config.server_name.as_bytes());
    payload.put_u8(0);
    payload.put_u32_le(1); // connection id
    payload.put_slice(&scramble[..8]);
    payload.put_u8(0); // filler

    let capabilities = mysql_protocol::handshake::default_client_capabilities();
    payload.put_u16_le((capabilities.bits() & 0xFFFF) as u16);
    payload.put_u8(UTF8MB4_GENERAL_CI as u8);
    payload.put_u16_le(0x0002); // status: autocommit
    payload.put_u16_le((capabilities.bits() >> 16) as u16);
    payload.put_u8(21); // auth_plugin_data_len (8 + 13)
    payload.put_bytes(0, 10); // reserved

    payload.put_slice(&scramble[8..]);
    payload.put_u8(0);

    payload.put_slice(b"mysql_native_password");
    payload.put_u8(0);

    write(stream, 0, &payload).await
}

async fn send_ok(stream: &mut TcpStream, seq: u8, affected_rows: u64, status: u16) -> Result<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(0x00);
    write_lenenc_int(&mut buf, affected_rows);
    write_lenenc_int(&mut buf, 0); // last insert id
    buf.put_u16_le(status);
    buf.put_u16_le(0); // warnings
    write(stream, seq, &buf).await
}

async fn send_err(stream: &mut TcpStream, seq: u8, code: i32, message: &str) -> Result<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(0xFF);
    buf.put_u16_le(code.clamp(0, u16::MAX as i32) as u16);
    buf.put_u8(b'#');
    buf.put_slice(b"HY000");
    buf.put_slice(message.as_bytes());
    write(stream, seq, &buf).await
}

async fn send_query_response(stream: &mut TcpStream, seq: u8, response: MockResponse) -> Result<u8> {
    match response {
        MockResponse::Scalar(value) => {
            let column = MockColumn::new("", value.kind());
            send_result_set(stream, seq, &[column], &[vec![value]]).await
        }
        MockResponse::Rows { columns, rows } => send_result_set(stream, seq, &columns, &rows).await,
        MockResponse::Error { number, message, .. } => send_err(stream, seq, number, &message).await,
        MockResponse::RowsAffected(count) => send_ok(stream, seq, count, 0x0002).await,
        MockResponse::Custom(_) => send_ok(stream, seq, 0, 0x0002).await,
    }
}

async fn send_result_set(
    stream: &mut TcpStream,
    mut seq: u8,
    columns: &[MockColumn],
    rows: &[Vec<ScalarValue>],
) -> Result<u8> {
    let mut count_buf = BytesMut::new();
    write_lenenc_int(&mut count_buf, columns.len() as u64);
    seq = write(stream, seq, &count_buf).await?;

    for col in columns {
        seq = write(stream, seq, &encode_column_definition(col)).await?;
    }
    // No legacy EOF: every client driven against this server sets
    // CLIENT_DEPRECATE_EOF.

    for row in rows {
        seq = write(stream, seq, &encode_row(row)).await?;
    }

    send_ok(stream, seq, 0, 0x0002).await
}

fn encode_column_definition(col: &MockColumn) -> Bytes {
    let mut buf = BytesMut::new();
    write_lenenc_string(&mut buf, b"def"); // catalog
    write_lenenc_string(&mut buf, b""); // schema
    write_lenenc_string(&mut buf, b""); // table
    write_lenenc_string(&mut buf, b""); // org_table
    write_lenenc_string(&mut buf, col.name.as_bytes());
    write_lenenc_string(&mut buf, col.name.as_bytes()); // org_name
    write_lenenc_int(&mut buf, 0x0C); // length of fixed fields
    buf.put_u16_le(UTF8MB4_GENERAL_CI);
    buf.put_u32_le(col.max_length.unwrap_or(255));
    buf.put_u8(column_type_of(col.kind));
    buf.put_u16_le(if col.nullable { 0 } else { 0x0001 });
    buf.put_u8(0); // decimals
    buf.put_u16_le(0); // filler
    buf.freeze()
}

fn encode_row(values: &[ScalarValue]) -> Bytes {
    let mut buf = BytesMut::new();
    for value in values {
        match value.as_text() {
            Some(text) => write_lenenc_string(&mut buf, text.as_bytes()),
            None => buf.put_u8(wire_framing::lenenc::NULL_SENTINEL),
        }
    }
    buf.freeze()
}

async fn write(stream: &mut TcpStream, seq: u8, payload: &[u8]) -> Result<u8> {
    mysql_protocol::packet::write_packet(stream, seq, payload)
        .await
        .map_err(|e| MockServerError::Protocol(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn server_starts_and_reports_its_address() {
        let server = MockMySqlServer::builder().with_server_name("5.7.44-mock").build().await.unwrap();
        assert!(server.port() > 0);
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn column_type_mapping_matches_mysql_wire_types() {
        assert_eq!(column_type_of(ScalarKind::Int), TYPE_LONG);
        assert_eq!(column_type_of(ScalarKind::BigInt), TYPE_LONGLONG);
        assert_eq!(column_type_of(ScalarKind::Text), TYPE_VAR_STRING);
    }

    #[test]
    fn encode_row_writes_null_sentinel_for_null_values() {
        let row = encode_row(&[ScalarValue::Null]);
        assert_eq!(row[0], wire_framing::lenenc::NULL_SENTINEL);
    }

    #[test]
    fn encode_row_length_prefixes_text_values() {
        let row = encode_row(&[ScalarValue::String("hi".into())]);
        assert_eq!(row[0], 2);
        assert_eq!(&row[1..], b"hi");
    }
}
