//! The unified connection.
//!
//! One `SqlConnection` dispatches `query`/`execute`/`call_procedure` and
//! transaction control across whichever engine [`Config::engine`] selects.
//! PostgreSQL and MySQL already do their own connect/login/query work
//! inside `pg-protocol`/`mysql-protocol`; this module's own job is TDS,
//! which — unlike the other two — needs its connect/login orchestration
//! built here, on top of `tds-codec`'s framing and `tds-protocol`'s wire
//! types; the other two engines just get thin dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use bytes::Bytes;
use sql_core::{ResultBatch, ResultSet, SqlColumn, SqlParameter, SqlRow, SqlValue};
use tds_protocol::{
    ColMetaData, EncryptionLevel, EnvChange, EnvChangeType, EnvChangeValue, Login7, MAX_PACKET_SIZE,
    PacketHeader, PacketStatus, PacketType, PreLogin, RpcParam, RpcRequest, Token, TokenParser,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[cfg(feature = "tls")]
use sql_tls::{TlsConfig, TlsConnector, TlsPreloginWrapper, TlsStream};

use crate::cancel::CancelHandle;
use crate::config::{Config, Engine, TlsPolicy};
use crate::error::{Error, Result};
use crate::state::ConnectionState;

/// The TDS connection, in whichever transport shape its encryption
/// negotiation settled on.
enum TdsHandle {
    Plain(tds_codec::Connection<TcpStream>),
    #[cfg(feature = "tls")]
    Tls(tds_codec::Connection<TlsStream<TlsPreloginWrapper<TcpStream>>>),
}

impl TdsHandle {
    async fn send_message(
        &mut self,
        packet_type: PacketType,
        payload: Bytes,
        max_packet_size: usize,
    ) -> Result<()> {
        match self {
            Self::Plain(conn) => conn
                .send_message(packet_type, payload, max_packet_size)
                .await
                .map_err(Error::from),
            #[cfg(feature = "tls")]
            Self::Tls(conn) => conn
                .send_message(packet_type, payload, max_packet_size)
                .await
                .map_err(Error::from),
        }
    }

    async fn read_message(&mut self) -> Result<Option<tds_codec::Message>> {
        match self {
            Self::Plain(conn) => conn.read_message().await.map_err(Error::from),
            #[cfg(feature = "tls")]
            Self::Tls(conn) => conn.read_message().await.map_err(Error::from),
        }
    }

    fn cancel_handle(&self) -> CancelHandle {
        match self {
            Self::Plain(conn) => CancelHandle::from_tds_plain(conn.cancel_handle()),
            #[cfg(feature = "tls")]
            Self::Tls(conn) => CancelHandle::from_tds_tls(conn.cancel_handle()),
        }
    }
}

/// Which engine-specific connection this handle owns.
enum EngineHandle {
    Tds(TdsHandle),
    Postgres(pg_protocol::PgConnection),
    MySql(mysql_protocol::MysqlConnection),
}

/// A connection to a TDS, PostgreSQL, or MySQL server, speaking whichever
/// wire protocol [`Config::engine`] selected.
pub struct SqlConnection {
    config: Config,
    engine: EngineHandle,
    state: ConnectionState,
    /// Set when a request fails in a way that poisons the connection; the
    /// next request refuses to run rather than reuse a half-dead socket.
    poisoned: Arc<AtomicBool>,
    transaction_active: bool,
    /// TDS `BeginTransaction` EnvChange descriptor; 0 means auto-commit.
    /// Unused by PostgreSQL/MySQL, which track transaction state server-side.
    transaction_descriptor: u64,
    server_version: Option<String>,
    current_database: Option<String>,
}

impl SqlConnection {
    /// Connect using the given configuration, performing the connect,
    /// TLS-negotiation (when applicable), and login/handshake steps for
    /// whichever engine is selected.
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;

        let (engine, server_version, current_database) = match config.engine {
            Engine::Tds => connect_tds(&config).await?,
            Engine::Postgres => connect_postgres(&config).await?,
            Engine::MySql => connect_mysql(&config).await?,
        };

        Ok(Self {
            config,
            engine,
            state: ConnectionState::Ready,
            poisoned: Arc::new(AtomicBool::new(false)),
            transaction_active: false,
            transaction_descriptor: 0,
            server_version,
            current_database,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Which engine this connection speaks.
    #[must_use]
    pub fn engine(&self) -> Engine {
        self.config.engine
    }

    /// Server version string, when the connect handshake reported one.
    #[must_use]
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// Currently selected database, when known.
    #[must_use]
    pub fn current_database(&self) -> Option<&str> {
        self.current_database.as_deref()
    }

    /// A handle that can cancel the request currently in flight from
    /// another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        match &self.engine {
            EngineHandle::Tds(handle) => handle.cancel_handle(),
            EngineHandle::Postgres(_) | EngineHandle::MySql(_) => {
                CancelHandle::poison_only(Arc::clone(&self.poisoned))
            }
        }
    }

    /// Run a statement or batch, returning every result set it produced.
    pub async fn query(&mut self, sql: &str, params: &[SqlParameter]) -> Result<ResultBatch> {
        if self.poisoned.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        if self.state.is_terminal() {
            return Err(Error::ConnectionClosed);
        }

        self.state = ConnectionState::Busy;
        let result = match &mut self.engine {
            EngineHandle::Tds(handle) => {
                run_tds_batch(handle, sql, params, &mut self.transaction_descriptor).await
            }
            EngineHandle::Postgres(conn) => conn.query(sql, params).await.map_err(Error::from),
            EngineHandle::MySql(conn) => conn.query(sql, params).await.map_err(Error::from),
        };

        match result {
            Ok(batch) => {
                self.state = ConnectionState::Ready;
                Ok(batch)
            }
            Err(err) => {
                self.state = ConnectionState::Poisoned;
                self.poisoned.store(true, std::sync::atomic::Ordering::SeqCst);
                Err(err)
            }
        }
    }

    /// Run a statement for its side effects, returning only the total rows
    /// affected.
    pub async fn execute(&mut self, sql: &str, params: &[SqlParameter]) -> Result<u64> {
        let batch = self.query(sql, params).await?;
        Ok(batch.rows_affected())
    }

    /// Run a `SELECT ... FOR JSON` (or any query whose first result set is a
    /// single text column of JSON fragments), returning each complete
    /// top-level object.
    ///
    /// Chunk boundaries chosen by the server rarely land on object
    /// boundaries, so this feeds every row's text through a
    /// [`tds_protocol::JsonAssembler`] rather than assuming one row is one
    /// object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if the first result set's first column
    /// is not text-valued.
    pub async fn query_json(&mut self, sql: &str, params: &[SqlParameter]) -> Result<Vec<String>> {
        let batch = self.query(sql, params).await?;
        let mut assembler = tds_protocol::JsonAssembler::new();
        let mut objects = Vec::new();
        for row in batch.rows() {
            let chunk = row.get(0).and_then(SqlValue::as_str).ok_or_else(|| {
                Error::Unsupported("query_json expects a single text column".to_owned())
            })?;
            objects.extend(assembler.push_chunk(chunk));
        }
        Ok(objects)
    }

    /// Begin a transaction. Returns a caller error if one is already open.
    pub async fn begin_transaction(
        &mut self,
        isolation: crate::transaction::IsolationLevel,
    ) -> Result<()> {
        if self.transaction_active {
            return Err(Error::ProtocolError(
                "a transaction is already open on this connection".into(),
            ));
        }
        self.execute(isolation.as_sql(), &[]).await?;
        self.execute(crate::transaction::begin_statement(self.config.engine), &[])
            .await?;
        self.transaction_active = true;
        Ok(())
    }

    /// Commit the open transaction.
    pub async fn commit(&mut self) -> Result<()> {
        self.end_transaction("COMMIT").await
    }

    /// Roll back the open transaction.
    pub async fn rollback(&mut self) -> Result<()> {
        self.end_transaction("ROLLBACK").await
    }

    async fn end_transaction(&mut self, statement: &str) -> Result<()> {
        if !self.transaction_active {
            return Err(Error::ProtocolError("no transaction is open on this connection".into()));
        }
        self.execute(statement, &[]).await?;
        self.transaction_active = false;
        self.transaction_descriptor = 0;
        Ok(())
    }

    /// True if a transaction is currently open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transaction_active
    }

    /// Close the connection, freeing its transport.
    pub async fn close(mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        match &mut self.engine {
            EngineHandle::Tds(_) => Ok(()),
            EngineHandle::Postgres(conn) => conn.close().await.map_err(Error::from),
            EngineHandle::MySql(conn) => conn.close().await.map_err(Error::from),
        }
    }
}

async fn connect_postgres(config: &Config) -> Result<(EngineHandle, Option<String>, Option<String>)> {
    let pg_config = pg_protocol::PgConfig {
        host: config.host.clone(),
        port: config.port,
        database: config.database.clone().unwrap_or_default(),
        username: config.username.clone(),
        password: config.password.clone(),
        tls_mode: match config.tls {
            TlsPolicy::Disable => pg_protocol::TlsMode::Disable,
            TlsPolicy::Prefer => pg_protocol::TlsMode::Prefer,
            TlsPolicy::Require => pg_protocol::TlsMode::Require,
        },
        trust_server_certificate: config.trust_server_certificate,
        connect_timeout: config.timeouts.connect_timeout,
    };
    let conn = pg_protocol::PgConnection::connect(&pg_config).await?;
    let database = config.database.clone();
    Ok((EngineHandle::Postgres(conn), None, database))
}

async fn connect_mysql(config: &Config) -> Result<(EngineHandle, Option<String>, Option<String>)> {
    let mysql_config = mysql_protocol::MysqlConfig {
        host: config.host.clone(),
        port: config.port,
        database: config.database.clone().unwrap_or_default(),
        username: config.username.clone(),
        password: config.password.clone(),
        tls_mode: match config.tls {
            TlsPolicy::Disable => mysql_protocol::TlsMode::Disable,
            TlsPolicy::Prefer => mysql_protocol::TlsMode::Prefer,
            TlsPolicy::Require => mysql_protocol::TlsMode::Require,
        },
        trust_server_certificate: config.trust_server_certificate,
        connect_timeout: config.timeouts.connect_timeout,
    };
    let conn = mysql_protocol::MysqlConnection::connect(&mysql_config).await?;
    let database = config.database.clone();
    Ok((EngineHandle::MySql(conn), None, database))
}

/// TDS connect: raw-TCP PreLogin, encryption negotiation, optional TLS
/// upgrade, then Login7 over the framed connection.
///
/// NTLM (`config.domain.is_some()`) is recognized but not yet wired to an
/// SSPI token exchange; it returns [`Error::Unsupported`] rather than
/// silently falling back to SQL auth.
async fn connect_tds(config: &Config) -> Result<(EngineHandle, Option<String>, Option<String>)> {
    if config.domain.is_some() {
        return Err(Error::Unsupported(
            "NTLM authentication is not yet implemented".into(),
        ));
    }

    let addr = format!("{}:{}", config.host, config.port);
    let mut tcp = timeout(config.timeouts.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Timeout)??;
    tcp.set_nodelay(true)?;

    let client_encryption = if config.tls == TlsPolicy::Disable {
        EncryptionLevel::NotSupported
    } else {
        EncryptionLevel::On
    };

    let prelogin = PreLogin::new()
        .with_version(tds_protocol::TdsVersion::V7_4)
        .with_encryption(client_encryption);
    send_raw_packet(&mut tcp, PacketType::PreLogin, &prelogin.encode()).await?;
    let response = read_raw_message(&mut tcp).await?;
    let server_prelogin = PreLogin::decode(response.as_ref())?;

    let use_tls = negotiate_encryption(client_encryption, server_prelogin.encryption, config.tls)?;

    let max_packet = tds_protocol::DEFAULT_PACKET_SIZE;
    let (handle, login_response) = if use_tls {
        connect_tds_tls(tcp, config).await?
    } else {
        let mut conn = tds_codec::Connection::new(tcp);
        let login_response = login_tds(&mut conn, config, max_packet).await?;
        (TdsHandle::Plain(conn), login_response)
    };

    Ok((
        EngineHandle::Tds(handle),
        login_response.server_version,
        login_response.database,
    ))
}

#[cfg(feature = "tls")]
async fn connect_tds_tls(
    tcp: TcpStream,
    config: &Config,
) -> Result<(TdsHandle, LoginOutcome)> {
    let tls_config = TlsConfig::default()
        .trust_server_certificate(config.trust_server_certificate)
        .with_server_name(config.host.clone());
    let connector = TlsConnector::new(tls_config)?;
    let wrapper = TlsPreloginWrapper::new(tcp);
    let mut tls_stream = connector.connect(wrapper, &config.host).await?;
    tls_stream.get_mut().0.handshake_complete();

    let mut conn = tds_codec::Connection::new(tls_stream);
    let login_response = login_tds(&mut conn, config, tds_protocol::DEFAULT_PACKET_SIZE).await?;
    Ok((TdsHandle::Tls(conn), login_response))
}

#[cfg(not(feature = "tls"))]
async fn connect_tds_tls(
    _tcp: TcpStream,
    _config: &Config,
) -> Result<(TdsHandle, LoginOutcome)> {
    Err(Error::Unsupported(
        "server requires TLS but this build has the \"tls\" feature disabled".into(),
    ))
}

/// The two encryption outcomes this crate supports: full session TLS, or
/// none at all. The server's "login only" response (`Off`/`Off`, encrypting
/// just the `Login7` exchange) is not one of them.
fn negotiate_encryption(
    client: EncryptionLevel,
    server: EncryptionLevel,
    policy: TlsPolicy,
) -> Result<bool> {
    match (client, server) {
        (EncryptionLevel::NotSupported, EncryptionLevel::NotSupported) => Ok(false),
        (EncryptionLevel::NotSupported, _) => Err(Error::TlsError(
            "server requires encryption but this connection disabled TLS".into(),
        )),
        (_, EncryptionLevel::NotSupported) => {
            if policy == TlsPolicy::Require {
                Err(Error::TlsError("server does not support encryption".into()))
            } else {
                Ok(false)
            }
        }
        _ => Ok(true),
    }
}

async fn send_raw_packet(stream: &mut TcpStream, packet_type: PacketType, payload: &[u8]) -> Result<()> {
    let header = PacketHeader::new(
        packet_type,
        PacketStatus::END_OF_MESSAGE,
        (tds_protocol::PACKET_HEADER_SIZE + payload.len()) as u16,
    )
    .with_packet_id(1);
    let mut buf = Vec::with_capacity(tds_protocol::PACKET_HEADER_SIZE + payload.len());
    header.encode(&mut buf);
    buf.extend_from_slice(payload);
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one complete (possibly multi-packet) message from a raw, unframed
/// `TcpStream`, used only before a `tds_codec::Connection` exists to do it
/// for us (the PreLogin exchange, and — on the non-TLS path — Login7).
async fn read_raw_message(stream: &mut TcpStream) -> Result<Bytes> {
    let mut message = Vec::new();
    loop {
        let mut header_buf = [0u8; tds_protocol::PACKET_HEADER_SIZE];
        stream.read_exact(&mut header_buf).await?;
        let header = PacketHeader::decode(&mut &header_buf[..])?;

        let payload_len = header.payload_length();
        let mut payload = vec![0u8; payload_len];
        stream.read_exact(&mut payload).await?;
        message.extend_from_slice(&payload);

        if header.is_end_of_message() {
            break;
        }
    }
    Ok(Bytes::from(message))
}

/// Outcome of the Login7 exchange.
struct LoginOutcome {
    server_version: Option<String>,
    database: Option<String>,
}

async fn login_tds<T>(
    conn: &mut tds_codec::Connection<T>,
    config: &Config,
    max_packet: usize,
) -> Result<LoginOutcome>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let login = Login7::new()
        .with_tds_version(tds_protocol::TdsVersion::V7_4)
        .with_database(config.database.clone().unwrap_or_default())
        .with_app_name(config.application_name.clone())
        .with_server_name(config.host.clone())
        .with_hostname(config.workstation.clone())
        .with_packet_size(max_packet as u32)
        .with_read_only_intent(config.read_only);
    let login = match &config.domain {
        Some(_) => login.with_integrated_auth(sql_auth::ntlm::negotiate_message()),
        None => login.with_sql_auth(&config.username, &config.password),
    };

    conn.send_message(PacketType::Tds7Login, login.encode(), max_packet)
        .await?;

    let message = conn
        .read_message()
        .await?
        .ok_or(Error::ConnectionClosed)?;
    let mut parser = TokenParser::new(message.payload);

    if let Some(domain) = &config.domain {
        let Some(Token::Sspi(sspi)) = parser.next_token()? else {
            return Err(Error::ProtocolError(
                "expected an SSPI challenge after the NTLM negotiate message".into(),
            ));
        };
        let server_challenge = sql_auth::ntlm::parse_challenge_message(&sspi.data)?;
        let client_challenge: [u8; 8] = rand::random();
        let authenticate = sql_auth::ntlm::authenticate_message(
            domain,
            &config.username,
            &config.workstation,
            &config.password,
            &server_challenge,
            &client_challenge,
        );
        conn.send_message(PacketType::Sspi, Bytes::from(authenticate), max_packet)
            .await?;
        let message = conn
            .read_message()
            .await?
            .ok_or(Error::ConnectionClosed)?;
        parser = TokenParser::new(message.payload);
    }

    let mut outcome = LoginOutcome {
        server_version: None,
        database: config.database.clone(),
    };

    while let Some(token) = parser.next_token()? {
        match token {
            Token::LoginAck(ack) => {
                outcome.server_version = Some(ack.prog_name.clone());
            }
            Token::EnvChange(env) => {
                if let EnvChangeType::Database = env.env_type {
                    if let EnvChangeValue::String(name) = &env.new_value {
                        outcome.database = Some(name.clone());
                    }
                }
            }
            Token::Error(err) => {
                return Err(Error::server_error(
                    Engine::Tds,
                    i64::from(err.number),
                    None,
                    err.message,
                ));
            }
            Token::Done(_) => break,
            _ => {}
        }
    }

    Ok(outcome)
}

/// Run one batch or RPC on a TDS connection, decoding every token the
/// server sends back into a [`ResultBatch`].
async fn run_tds_batch(
    handle: &mut TdsHandle,
    sql: &str,
    params: &[SqlParameter],
    transaction_descriptor: &mut u64,
) -> Result<ResultBatch> {
    let max_packet = MAX_PACKET_SIZE.min(tds_protocol::DEFAULT_PACKET_SIZE * 4);

    if params.is_empty() {
        let payload = tds_protocol::encode_sql_batch_with_transaction(sql, *transaction_descriptor);
        handle
            .send_message(PacketType::SqlBatch, payload, max_packet)
            .await?;
    } else {
        let rpc_params: Vec<RpcParam> = params.iter().map(to_rpc_param).collect();
        let rpc = RpcRequest::execute_sql(sql, rpc_params);
        let payload = rpc.encode_with_transaction(*transaction_descriptor);
        handle
            .send_message(PacketType::Rpc, payload, max_packet)
            .await?;
    }

    let mut batch = ResultBatch::default();
    let mut current_columns: Option<Arc<Vec<SqlColumn>>> = None;
    let mut current_meta: Option<ColMetaData> = None;
    let mut current_rows: Vec<SqlRow> = Vec::new();

    loop {
        let message = handle.read_message().await?.ok_or(Error::ConnectionClosed)?;
        let mut parser = TokenParser::new(message.payload);
        let mut more_messages = false;

        while let Some(token) = parser.next_token_with_metadata(current_meta.as_ref())? {
            match token {
                Token::ColMetaData(meta) => {
                    current_columns = Some(Arc::new(columns_from_meta(&meta)));
                    current_meta = Some(meta);
                    current_rows.clear();
                }
                Token::Row(row) => {
                    push_row(&mut current_rows, &current_columns, row.values)?;
                }
                Token::NbcRow(row) => {
                    push_row(&mut current_rows, &current_columns, row.values)?;
                }
                Token::Done(done) => {
                    more_messages = finish_result_set(
                        &mut batch,
                        &mut current_columns,
                        &mut current_meta,
                        &mut current_rows,
                        done.status.count,
                        done.status.more,
                        done.row_count,
                    );
                }
                Token::DoneProc(done) => {
                    more_messages = finish_result_set(
                        &mut batch,
                        &mut current_columns,
                        &mut current_meta,
                        &mut current_rows,
                        done.status.count,
                        done.status.more,
                        done.row_count,
                    );
                }
                Token::DoneInProc(done) => {
                    more_messages = finish_result_set(
                        &mut batch,
                        &mut current_columns,
                        &mut current_meta,
                        &mut current_rows,
                        done.status.count,
                        done.status.more,
                        done.row_count,
                    );
                }
                Token::Error(err) => {
                    return Err(Error::server_error(
                        Engine::Tds,
                        i64::from(err.number),
                        None,
                        err.message,
                    ));
                }
                Token::Info(info) => {
                    batch.info_messages.push(info.message);
                }
                Token::ReturnStatus(status) => {
                    batch.return_status = Some(status);
                }
                Token::ReturnValue(value) => {
                    batch.output_params.insert(value.param_name.clone(), value.value);
                }
                Token::EnvChange(env) => {
                    process_transaction_env_change(&env, transaction_descriptor);
                }
                _ => {}
            }
        }

        if !more_messages {
            break;
        }
    }

    Ok(batch)
}

/// Shared tail of every `DONE`/`DONEPROC`/`DONEINPROC` token: flush whatever
/// rows accumulated for the just-finished result set and report whether
/// another one follows in this same message stream.
fn finish_result_set(
    batch: &mut ResultBatch,
    current_columns: &mut Option<Arc<Vec<SqlColumn>>>,
    current_meta: &mut Option<ColMetaData>,
    current_rows: &mut Vec<SqlRow>,
    has_count: bool,
    has_more: bool,
    row_count: u64,
) -> bool {
    if current_columns.is_some() || !current_rows.is_empty() {
        batch.sets.push(ResultSet {
            rows: std::mem::take(current_rows),
            rows_affected: if has_count { Some(row_count) } else { None },
        });
        *current_columns = None;
        *current_meta = None;
    }
    has_more
}

fn columns_from_meta(meta: &ColMetaData) -> Vec<SqlColumn> {
    meta.columns
        .iter()
        .map(|col| SqlColumn::new(col.name.clone(), u32::from(col.col_type), col.flags & 0x0001 != 0))
        .collect()
}

fn push_row(
    rows: &mut Vec<SqlRow>,
    columns: &Option<Arc<Vec<SqlColumn>>>,
    values: Vec<SqlValue>,
) -> Result<()> {
    let columns = columns
        .clone()
        .ok_or_else(|| Error::ProtocolError("row token arrived before column metadata".into()))?;
    rows.push(SqlRow::new(columns, values));
    Ok(())
}

fn to_rpc_param(param: &SqlParameter) -> RpcParam {
    let (type_id, max_length, value): (u8, Option<u16>, Option<Bytes>) = match &param.value {
        SqlValue::Null => (0xE7, Some(0xFFFF), None),
        SqlValue::Bool(b) => (0x68, Some(1), Some(Bytes::copy_from_slice(&[*b as u8]))),
        SqlValue::Int8(i) => (0x26, Some(1), Some(Bytes::copy_from_slice(&i.to_le_bytes()))),
        SqlValue::Int16(i) => (0x26, Some(2), Some(Bytes::copy_from_slice(&i.to_le_bytes()))),
        SqlValue::Int32(i) => (0x26, Some(4), Some(Bytes::copy_from_slice(&i.to_le_bytes()))),
        SqlValue::Int64(i) => (0x26, Some(8), Some(Bytes::copy_from_slice(&i.to_le_bytes()))),
        SqlValue::Float32(f) => (0x6D, Some(4), Some(Bytes::copy_from_slice(&f.to_le_bytes()))),
        SqlValue::Float64(f) => (0x6D, Some(8), Some(Bytes::copy_from_slice(&f.to_le_bytes()))),
        SqlValue::Text(s) => {
            let utf16: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
            (0xE7, Some(0xFFFF), Some(Bytes::from(utf16)))
        }
        SqlValue::Bytes(b) => (0xE7, Some(0xFFFF), Some(b.clone())),
        #[cfg(feature = "uuid")]
        SqlValue::Uuid(u) => (0x24, Some(16), Some(Bytes::copy_from_slice(u.as_bytes()))),
        #[cfg(feature = "decimal")]
        SqlValue::Decimal(d) => {
            let text = d.to_string();
            let utf16: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
            (0xE7, Some(0xFFFF), Some(Bytes::from(utf16)))
        }
        #[cfg(feature = "chrono")]
        SqlValue::Instant(dt) => {
            let text = dt.to_rfc3339();
            let utf16: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
            (0xE7, Some(0xFFFF), Some(Bytes::from(utf16)))
        }
        _ => unreachable!("SqlValue is non_exhaustive but all current variants are handled above"),
    };

    RpcParam {
        name: param.name.clone(),
        flags: if param.output {
            tds_protocol::ParamFlags::new().output()
        } else {
            tds_protocol::ParamFlags::new()
        },
        type_info: tds_protocol::RpcTypeInfo {
            type_id,
            max_length,
            precision: None,
            scale: None,
            collation: None,
            tvp_type_name: None,
        },
        value,
    }
}

/// Cumulative env-change bookkeeping for the transaction descriptor TDS
/// threads through `ALL_HEADERS` on every request after `BEGIN TRANSACTION`.
fn process_transaction_env_change(env: &EnvChange, transaction_descriptor: &mut u64) {
    match env.env_type {
        EnvChangeType::BeginTransaction => {
            if let EnvChangeValue::Binary(data) = &env.new_value {
                if data.len() >= 8 {
                    *transaction_descriptor = u64::from_le_bytes(
                        data[..8].try_into().expect("length checked above"),
                    );
                }
            }
        }
        EnvChangeType::CommitTransaction | EnvChangeType::RollbackTransaction => {
            *transaction_descriptor = 0;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_both_not_supported_is_no_tls() {
        assert!(!negotiate_encryption(
            EncryptionLevel::NotSupported,
            EncryptionLevel::NotSupported,
            TlsPolicy::Prefer
        )
        .unwrap());
    }

    #[test]
    fn negotiate_client_wants_tls_server_has_it() {
        assert!(negotiate_encryption(EncryptionLevel::On, EncryptionLevel::On, TlsPolicy::Prefer).unwrap());
    }

    #[test]
    fn negotiate_require_fails_without_server_support() {
        let err =
            negotiate_encryption(EncryptionLevel::On, EncryptionLevel::NotSupported, TlsPolicy::Require);
        assert!(err.is_err());
    }

    #[test]
    fn negotiate_prefer_falls_back_without_server_support() {
        assert!(
            !negotiate_encryption(EncryptionLevel::On, EncryptionLevel::NotSupported, TlsPolicy::Prefer)
                .unwrap()
        );
    }

    #[test]
    fn negotiate_client_disabled_but_server_requires_is_an_error() {
        let err = negotiate_encryption(
            EncryptionLevel::NotSupported,
            EncryptionLevel::On,
            TlsPolicy::Disable,
        );
        assert!(err.is_err());
    }

    #[test]
    fn transaction_descriptor_resets_on_commit() {
        let mut descriptor = 0x1234u64;
        let env = EnvChange {
            env_type: EnvChangeType::CommitTransaction,
            new_value: EnvChangeValue::Binary(Bytes::new()),
            old_value: EnvChangeValue::Binary(Bytes::new()),
        };
        process_transaction_env_change(&env, &mut descriptor);
        assert_eq!(descriptor, 0);
    }

    #[test]
    fn transaction_descriptor_reads_begin_transaction_payload() {
        let mut descriptor = 0u64;
        let env = EnvChange {
            env_type: EnvChangeType::BeginTransaction,
            new_value: EnvChangeValue::Binary(Bytes::copy_from_slice(&42u64.to_le_bytes())),
            old_value: EnvChangeValue::Binary(Bytes::new()),
        };
        process_transaction_env_change(&env, &mut descriptor);
        assert_eq!(descriptor, 42);
    }

    #[test]
    fn login7_uses_integrated_auth_when_domain_is_set() {
        let config = Config::new(Engine::Tds)
            .credentials("bob", "pw")
            .domain("CORP")
            .workstation("WS01");

        let login = Login7::new()
            .with_database(config.database.clone().unwrap_or_default())
            .with_hostname(config.workstation.clone());
        let login = match &config.domain {
            Some(_) => login.with_integrated_auth(sql_auth::ntlm::negotiate_message()),
            None => login.with_sql_auth(&config.username, &config.password),
        };

        assert!(login.option_flags2.integrated_security);
        assert!(login.username.is_empty());
        assert!(!login.sspi_data.is_empty());
    }

    #[test]
    fn login7_uses_sql_auth_without_a_domain() {
        let config = Config::new(Engine::Tds).credentials("bob", "pw");

        let login = Login7::new();
        let login = match &config.domain {
            Some(_) => login.with_integrated_auth(sql_auth::ntlm::negotiate_message()),
            None => login.with_sql_auth(&config.username, &config.password),
        };

        assert!(!login.option_flags2.integrated_security);
        assert_eq!(login.username, "bob");
    }
}
