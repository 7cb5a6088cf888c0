//! A scriptable TDS (SQL Server) mock server.
//!
//! Handles PRELOGIN and LOGIN7 with a fixed, unauthenticated handshake and
//! answers `SQL_BATCH`/`RPC` requests from the shared response table in
//! [`super::MockServerConfig`].

use bytes::{BufMut, Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tds_protocol::types::TypeId;
use tds_protocol::{
    DoneStatus, EnvChangeType, PACKET_HEADER_SIZE, PacketHeader, PacketStatus, PacketType,
    TokenType,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use super::{MockColumn, MockResponse, MockServer, MockServerConfig, MockServerError, Result, ScalarKind, ScalarValue, find_response};

/// Builder for [`MockTdsServer`].
pub struct MockTdsServerBuilder {
    config: MockServerConfig,
    tds_version: u32,
}

impl MockTdsServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig {
                default_response: Some(MockResponse::empty()),
                server_name: "MockSQLServer".to_string(),
                database: "master".to_string(),
                ..MockServerConfig::default()
            },
            tds_version: 0x74000004, // TDS 7.4
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

    /// Set the server name reported in `LOGINACK`.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = name.into();
        self
    }

    /// Set the default database reported in the post-login `ENVCHANGE`.
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.config.database = db.into();
        self
    }

    /// Build and start the mock server.
    pub async fn build(self) -> Result<MockTdsServer> {
        MockTdsServer::start(self.config, self.tds_version).await
    }
}

impl Default for MockTdsServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A mock TDS server for testing, simulating enough of a SQL Server
/// instance's handshake and query loop to exercise a real client.
pub struct MockTdsServer {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    connection_count: Arc<AtomicUsize>,
}

impl MockTdsServer {
    /// Create a new builder for the mock server.
    pub fn builder() -> MockTdsServerBuilder {
        MockTdsServerBuilder::new()
    }

    async fn start(config: MockServerConfig, tds_version: u32) -> Result<Self> {
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
                                    if let Err(e) = handle_connection(stream, config, tds_version).await {
                                        tracing::debug!("mock TDS connection error: {e}");
                                    }
                                    count.fetch_sub(1, Ordering::SeqCst);
                                });
                            }
                            Err(e) => {
                                tracing::error!("mock TDS accept error: {e}");
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

impl MockServer for MockTdsServer {
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

impl Drop for MockTdsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn type_id_of(kind: ScalarKind) -> TypeId {
    match kind {
        ScalarKind::Bool => TypeId::BitN,
        ScalarKind::Int => TypeId::IntN,
        ScalarKind::BigInt => TypeId::IntN,
        ScalarKind::Float => TypeId::FloatN,
        ScalarKind::Double => TypeId::FloatN,
        ScalarKind::Text => TypeId::NVarChar,
        ScalarKind::Binary => TypeId::BigVarBinary,
    }
}

fn encode_value(value: &ScalarValue, dst: &mut BytesMut) {
    match value {
        ScalarValue::Null => dst.put_u8(0),
        ScalarValue::Bool(v) => {
            dst.put_u8(1);
            dst.put_u8(u8::from(*v));
        }
        ScalarValue::Int(v) => {
            dst.put_u8(4);
            dst.put_i32_le(*v);
        }
        ScalarValue::BigInt(v) => {
            dst.put_u8(8);
            dst.put_i64_le(*v);
        }
        ScalarValue::Float(v) => {
            dst.put_u8(4);
            dst.put_f32_le(*v);
        }
        ScalarValue::Double(v) => {
            dst.put_u8(8);
            dst.put_f64_le(*v);
        }
        ScalarValue::String(s) => {
            let utf16: Vec<u16> = s.encode_utf16().collect();
            let byte_len = utf16.len() * 2;
            if byte_len > 0xFFFF {
                dst.put_u64_le(byte_len as u64);
                dst.put_u32_le(byte_len as u32);
                for c in utf16 {
                    dst.put_u16_le(c);
                }
                dst.put_u32_le(0);
            } else {
                dst.put_u16_le(byte_len as u16);
                for c in utf16 {
                    dst.put_u16_le(c);
                }
            }
        }
        ScalarValue::Binary(data) => {
            if data.len() > 0xFFFF {
                dst.put_u64_le(data.len() as u64);
                dst.put_u32_le(data.len() as u32);
                dst.extend_from_slice(data);
                dst.put_u32_le(0);
            } else {
                dst.put_u16_le(data.len() as u16);
                dst.extend_from_slice(data);
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    config: Arc<MockServerConfig>,
    tds_version: u32,
) -> Result<()> {
    let prelogin_request = read_packet(&mut stream).await?;
    if prelogin_request.packet_type != PacketType::PreLogin {
        return Err(MockServerError::Protocol(format!(
            "expected PreLogin, got {:?}",
            prelogin_request.packet_type
        )));
    }
    send_prelogin_response(&mut stream).await?;

    let login_request = read_packet(&mut stream).await?;
    if login_request.packet_type != PacketType::Tds7Login {
        return Err(MockServerError::Protocol(format!(
            "expected Tds7Login, got {:?}",
            login_request.packet_type
        )));
    }
    send_login_response(&mut stream, &config, tds_version).await?;

    loop {
        let packet = match read_packet(&mut stream).await {
            Ok(p) => p,
            Err(MockServerError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };

        match packet.packet_type {
            PacketType::SqlBatch => {
                let sql = decode_sql_batch(&packet.payload)?;
                let response = find_response(&sql, &config);
                send_query_response(&mut stream, response).await?;
            }
            PacketType::Rpc => {
                let response = config.default_response.clone().unwrap_or(MockResponse::empty());
                send_query_response(&mut stream, response).await?;
            }
            PacketType::Attention => {
                send_attention_ack(&mut stream).await?;
            }
            other => {
                tracing::debug!("mock TDS server: unexpected packet type {other:?}");
            }
        }
    }

    Ok(())
}

struct Packet {
    packet_type: PacketType,
    payload: Bytes,
}

async fn read_packet(stream: &mut TcpStream) -> Result<Packet> {
    let mut header_buf = [0u8; PACKET_HEADER_SIZE];
    stream.read_exact(&mut header_buf).await?;

    let mut cursor = &header_buf[..];
    let header =
        PacketHeader::decode(&mut cursor).map_err(|e| MockServerError::Protocol(e.to_string()))?;

    let payload_len = header.payload_length();
    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        stream.read_exact(&mut payload).await?;
    }

    let mut full_payload = BytesMut::from(&payload[..]);

    if !header.is_end_of_message() {
        loop {
            let mut next_header_buf = [0u8; PACKET_HEADER_SIZE];
            stream.read_exact(&mut next_header_buf).await?;

            let mut cursor = &next_header_buf[..];
            let next_header = PacketHeader::decode(&mut cursor)
                .map_err(|e| MockServerError::Protocol(e.to_string()))?;

            let next_payload_len = next_header.payload_length();
            let mut next_payload = vec![0u8; next_payload_len];
            if next_payload_len > 0 {
                stream.read_exact(&mut next_payload).await?;
            }

            full_payload.extend_from_slice(&next_payload);

            if next_header.is_end_of_message() {
                break;
            }
        }
    }

    Ok(Packet {
        packet_type: header.packet_type,
        payload: full_payload.freeze(),
    })
}

async fn write_packet(stream: &mut TcpStream, packet_type: PacketType, payload: &[u8]) -> Result<()> {
    let total_len = PACKET_HEADER_SIZE + payload.len();
    let header = PacketHeader {
        packet_type,
        status: PacketStatus::END_OF_MESSAGE,
        length: total_len as u16,
        spid: 0,
        packet_id: 1,
        window: 0,
    };

    let mut buf = BytesMut::with_capacity(total_len);
    header.encode(&mut buf);
    buf.extend_from_slice(payload);

    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

async fn send_prelogin_response(stream: &mut TcpStream) -> Result<()> {
    let mut response = BytesMut::new();

    response.put_u8(0x00); // VERSION token
    response.put_u16(11); // offset
    response.put_u16(6); // length

    response.put_u8(0x01); // ENCRYPTION token
    response.put_u16(17);
    response.put_u16(1);

    response.put_u8(0xFF); // terminator

    response.put_u8(16); // major version
    response.put_u8(0);
    response.put_u16_le(0);
    response.put_u16_le(0);

    response.put_u8(0x00); // ENCRYPT_OFF

    write_packet(stream, PacketType::PreLogin, &response).await
}

async fn send_login_response(
    stream: &mut TcpStream,
    config: &MockServerConfig,
    tds_version: u32,
) -> Result<()> {
    let mut response = BytesMut::new();
    encode_env_change(&mut response, EnvChangeType::Database, &config.database, "");
    encode_env_change(&mut response, EnvChangeType::PacketSize, "4096", "4096");
    encode_login_ack(&mut response, &config.server_name, tds_version);
    encode_done(&mut response, 0, false);
    write_packet(stream, PacketType::TabularResult, &response).await
}

fn encode_env_change(dst: &mut BytesMut, env_type: EnvChangeType, new_val: &str, old_val: &str) {
    let new_utf16: Vec<u16> = new_val.encode_utf16().collect();
    let old_utf16: Vec<u16> = old_val.encode_utf16().collect();
    let data_len = 1 + 1 + new_utf16.len() * 2 + 1 + old_utf16.len() * 2;

    dst.put_u8(TokenType::EnvChange as u8);
    dst.put_u16_le(data_len as u16);
    dst.put_u8(env_type as u8);

    dst.put_u8(new_utf16.len() as u8);
    for c in &new_utf16 {
        dst.put_u16_le(*c);
    }
    dst.put_u8(old_utf16.len() as u8);
    for c in &old_utf16 {
        dst.put_u16_le(*c);
    }
}

fn encode_login_ack(dst: &mut BytesMut, server_name: &str, tds_version: u32) {
    let name_utf16: Vec<u16> = server_name.encode_utf16().collect();
    let data_len = 1 + 4 + 1 + name_utf16.len() * 2 + 4;

    dst.put_u8(TokenType::LoginAck as u8);
    dst.put_u16_le(data_len as u16);
    dst.put_u8(1); // interface: SQL
    dst.put_u32_le(tds_version);

    dst.put_u8(name_utf16.len() as u8);
    for c in &name_utf16 {
        dst.put_u16_le(*c);
    }
    dst.put_u32_le(0x10000000); // program version
}

fn encode_done(dst: &mut BytesMut, row_count: u64, more: bool) {
    dst.put_u8(TokenType::Done as u8);
    let status = DoneStatus {
        count: row_count > 0,
        more,
        ..Default::default()
    };
    dst.put_u16_le(status.to_bits());
    dst.put_u16_le(0xC1); // cur_cmd: SELECT
    dst.put_u64_le(row_count);
}

fn decode_sql_batch(payload: &Bytes) -> Result<String> {
    let mut cursor = payload.as_ref();

    if cursor.len() >= 4 {
        let total_len = u32::from_le_bytes([cursor[0], cursor[1], cursor[2], cursor[3]]) as usize;
        if total_len >= 4 && total_len < cursor.len() && total_len < 1000 {
            cursor = &cursor[total_len..];
        }
    }

    if cursor.len() % 2 != 0 {
        return Err(MockServerError::Protocol("invalid UTF-16 SQL text length".to_string()));
    }

    let char_count = cursor.len() / 2;
    let mut chars = Vec::with_capacity(char_count);
    for i in 0..char_count {
        chars.push(u16::from_le_bytes([cursor[i * 2], cursor[i * 2 + 1]]));
    }

    String::from_utf16(&chars).map_err(|_| MockServerError::Protocol("invalid UTF-16 SQL text".to_string()))
}

async fn send_query_response(stream: &mut TcpStream, response: MockResponse) -> Result<()> {
    let mut buf = BytesMut::new();

    match response {
        MockResponse::Scalar(value) => {
            encode_colmetadata(&mut buf, &[MockColumn::new("", value.kind())]);
            encode_row(&mut buf, std::slice::from_ref(&value));
            encode_done(&mut buf, 1, false);
        }
        MockResponse::Rows { columns, rows } => {
            encode_colmetadata(&mut buf, &columns);
            for row in &rows {
                encode_row(&mut buf, row);
            }
            encode_done(&mut buf, rows.len() as u64, false);
        }
        MockResponse::Error { number, message, severity } => {
            encode_error(&mut buf, number, &message, severity);
            encode_done(&mut buf, 0, false);
        }
        MockResponse::RowsAffected(count) => {
            encode_done(&mut buf, count, false);
        }
        MockResponse::Custom(_) => {
            // Resolved before reaching here by `find_response`.
            encode_done(&mut buf, 0, false);
        }
    }

    write_packet(stream, PacketType::TabularResult, &buf).await
}

fn encode_colmetadata(dst: &mut BytesMut, columns: &[MockColumn]) {
    dst.put_u8(TokenType::ColMetaData as u8);
    dst.put_u16_le(columns.len() as u16);

    for col in columns {
        dst.put_u32_le(0); // UserType
        dst.put_u16_le(if col.nullable { 0x01 } else { 0x00 }); // Flags
        let type_id = type_id_of(col.kind);
        dst.put_u8(type_id as u8);

        match type_id {
            TypeId::IntN | TypeId::BitN | TypeId::FloatN | TypeId::MoneyN | TypeId::DateTimeN => {
                dst.put_u8(col.max_length.unwrap_or(4) as u8);
            }
            TypeId::NVarChar | TypeId::NChar => {
                dst.put_u16_le((col.max_length.unwrap_or(4000) * 2) as u16);
                dst.put_u32_le(0x0904D000); // LCID
                dst.put_u8(0x34); // sort id
            }
            TypeId::BigVarBinary | TypeId::BigBinary => {
                dst.put_u16_le(col.max_length.unwrap_or(8000) as u16);
            }
            _ => {}
        }

        let name_utf16: Vec<u16> = col.name.encode_utf16().collect();
        dst.put_u8(name_utf16.len() as u8);
        for c in &name_utf16 {
            dst.put_u16_le(*c);
        }
    }
}

fn encode_row(dst: &mut BytesMut, values: &[ScalarValue]) {
    dst.put_u8(TokenType::Row as u8);
    for value in values {
        encode_value(value, dst);
    }
}

fn encode_error(dst: &mut BytesMut, number: i32, message: &str, severity: u8) {
    let msg_utf16: Vec<u16> = message.encode_utf16().collect();
    let server_utf16: Vec<u16> = "MockServer".encode_utf16().collect();
    let data_len = (4 + 1 + 1 + 2 + msg_utf16.len() * 2 + 1 + server_utf16.len() * 2 + 1) + 4;

    dst.put_u8(TokenType::Error as u8);
    dst.put_u16_le(data_len as u16);
    dst.put_i32_le(number);
    dst.put_u8(1); // state
    dst.put_u8(severity);

    dst.put_u16_le(msg_utf16.len() as u16);
    for c in &msg_utf16 {
        dst.put_u16_le(*c);
    }
    dst.put_u8(server_utf16.len() as u8);
    for c in &server_utf16 {
        dst.put_u16_le(*c);
    }
    dst.put_u8(0); // procedure name
    dst.put_i32_le(1); // line number
}

async fn send_attention_ack(stream: &mut TcpStream) -> Result<()> {
    let mut buf = BytesMut::new();
    buf.put_u8(TokenType::Done as u8);
    let status = DoneStatus { attn: true, ..Default::default() };
    buf.put_u16_le(status.to_bits());
    buf.put_u16_le(0);
    buf.put_u64_le(0);
    write_packet(stream, PacketType::TabularResult, &buf).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn server_starts_and_reports_its_address() {
        let server = MockTdsServer::builder()
            .with_server_name("TestServer")
            .build()
            .await
            .unwrap();

        assert!(server.port() > 0);
        assert_eq!(server.host(), "127.0.0.1");
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn encode_value_int_is_length_prefixed() {
        let mut buf = BytesMut::new();
        encode_value(&ScalarValue::Int(42), &mut buf);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], 4);
        assert_eq!(i32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]), 42);
    }

    #[test]
    fn encode_value_string_counts_utf16_bytes() {
        let mut buf = BytesMut::new();
        encode_value(&ScalarValue::String("test".to_string()), &mut buf);
        assert_eq!(buf.len(), 10);
        assert_eq!(u16::from_le_bytes([buf[0], buf[1]]), 8);
    }

    #[test]
    fn mock_column_helpers_set_logical_kind() {
        assert_eq!(MockColumn::int("id").kind, ScalarKind::Int);
        assert_eq!(MockColumn::text("name", 50).kind, ScalarKind::Text);
    }

    #[test]
    fn done_token_sets_count_flag_when_rows_are_present() {
        let mut buf = BytesMut::new();
        encode_done(&mut buf, 5, false);
        assert_eq!(buf[0], TokenType::Done as u8);
        let status = u16::from_le_bytes([buf[1], buf[2]]);
        assert_eq!(status & 0x0010, 0x0010); // DONE_COUNT
    }
}
