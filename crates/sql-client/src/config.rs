//! Client configuration shared across the TDS, PostgreSQL, and MySQL engines.

use std::time::Duration;

use crate::error::Error;

/// Which wire protocol a [`Config`] connects with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// MS-TDS 7.4 (SQL Server).
    Tds,
    /// PostgreSQL protocol v3.
    Postgres,
    /// MySQL/MariaDB protocol v10.
    MySql,
}

/// TLS negotiation policy.
///
/// Each engine reaches this decision through a different wire exchange
/// (TDS pre-login encryption option, PostgreSQL's single-byte `SSLRequest`
/// reply, MySQL's capability-flag upgrade) but the caller's intent is the
/// same in all three cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Abort the connection if the server can't or won't encrypt.
    Require,
    /// Upgrade to TLS if the server offers it, otherwise continue in cleartext.
    Prefer,
    /// Never negotiate TLS.
    Disable,
}

/// Timeout configuration for the connection lifecycle, shared by all three
/// engines.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Time to establish the TCP connection (default: 15s).
    pub connect_timeout: Duration,
    /// Time to complete TLS negotiation (default: 10s).
    pub tls_timeout: Duration,
    /// Time to complete authentication (default: 30s).
    pub login_timeout: Duration,
    /// Default timeout for a single query/execute call (default: 30s).
    pub command_timeout: Duration,
    /// Time before an idle pooled connection is recycled (default: 300s).
    pub idle_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            tls_timeout: Duration::from_secs(10),
            login_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TCP connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the TLS handshake timeout.
    #[must_use]
    pub fn tls_timeout(mut self, timeout: Duration) -> Self {
        self.tls_timeout = timeout;
        self
    }

    /// Set the authentication timeout.
    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set the default command execution timeout.
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Total time allowed for a full connection (TCP + TLS + login).
    #[must_use]
    pub fn total_connect_timeout(&self) -> Duration {
        self.connect_timeout + self.tls_timeout + self.login_timeout
    }
}

/// Retry policy for transient error handling.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (default: 3).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry (default: 100ms).
    pub initial_backoff: Duration,
    /// Maximum backoff duration between retries (default: 30s).
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff (default: 2.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the initial backoff duration.
    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the maximum backoff duration.
    #[must_use]
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Set the backoff multiplier for exponential backoff.
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disable automatic retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff duration for a given retry attempt, exponential with a cap.
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = self.initial_backoff.as_millis() as f64
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis(base.min(self.max_backoff.as_millis() as f64) as u64)
    }

    /// Whether another retry is allowed after the given attempt number.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Connection configuration, shared across all three engines.
///
/// Marked `#[non_exhaustive]` to allow adding new fields without breaking
/// semver. Use [`Config::new`] or [`Config::from_connection_string`] (TDS
/// convenience syntax) to construct instances.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Which wire protocol to speak.
    pub engine: Engine,
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (default depends on `engine`: 1433/5432/3306).
    pub port: u16,
    /// Database name to select on connect.
    pub database: Option<String>,
    /// Username presented during authentication.
    pub username: String,
    /// Password used for authentication.
    pub password: String,
    /// Domain for NTLM authentication (TDS only; presence enables NTLM).
    pub domain: Option<String>,
    /// Workstation name advertised in the NTLM authenticate message (TDS
    /// only, ignored unless `domain` is set). Defaults to `"sql-client"`.
    pub workstation: String,
    /// Sets the TDS Application Intent read-only hint (TDS only).
    pub read_only: bool,
    /// Application name reported to the server (TDS only).
    pub application_name: String,
    /// TLS negotiation policy.
    pub tls: TlsPolicy,
    /// Skip server certificate validation when TLS is used.
    pub trust_server_certificate: bool,
    /// Timeout configuration for the connection lifecycle.
    pub timeouts: TimeoutConfig,
    /// Retry policy for transient error handling.
    pub retry: RetryPolicy,
}

impl Config {
    fn default_port(engine: Engine) -> u16 {
        match engine {
            Engine::Tds => 1433,
            Engine::Postgres => 5432,
            Engine::MySql => 3306,
        }
    }

    /// Create a new configuration for the given engine, with defaults.
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            host: "localhost".to_owned(),
            port: Self::default_port(engine),
            database: None,
            username: String::new(),
            password: String::new(),
            domain: None,
            workstation: "sql-client".to_owned(),
            read_only: false,
            application_name: "sql-client".to_owned(),
            tls: TlsPolicy::Prefer,
            trust_server_certificate: false,
            timeouts: TimeoutConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Parse an ADO.NET-style connection string into a TDS configuration.
    ///
    /// ```text
    /// Server=localhost;Database=mydb;User Id=sa;Password=secret;
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::new(Engine::Tds);

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "data source" => {
                    if let Some((host, port)) = value.split_once(',') {
                        config.host = host.to_owned();
                        config.port = port
                            .parse()
                            .map_err(|_| Error::Config(format!("invalid port: {port}")))?;
                    } else {
                        config.host = value.to_owned();
                    }
                }
                "database" | "initial catalog" => config.database = Some(value.to_owned()),
                "user id" | "uid" => config.username = value.to_owned(),
                "password" | "pwd" => config.password = value.to_owned(),
                "domain" => config.domain = Some(value.to_owned()),
                "workstation id" | "workstation" => config.workstation = value.to_owned(),
                "encrypt" => {
                    config.tls = match value.to_lowercase().as_str() {
                        "strict" | "true" | "yes" | "1" | "request" => TlsPolicy::Prefer,
                        "false" | "no" | "0" | "disable" => TlsPolicy::Disable,
                        _ => {
                            return Err(Error::Config(format!("invalid Encrypt value: {value}")));
                        }
                    };
                    if value.eq_ignore_ascii_case("strict") {
                        config.tls = TlsPolicy::Require;
                    }
                }
                "trustservercertificate" | "trust server certificate" => {
                    config.trust_server_certificate = value.eq_ignore_ascii_case("true")
                        || value.eq_ignore_ascii_case("yes")
                        || value == "1";
                }
                "connect timeout" | "connection timeout" => {
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid timeout: {value}")))?;
                    config.timeouts.connect_timeout = Duration::from_secs(secs);
                }
                "application intent" => {
                    config.read_only = value.eq_ignore_ascii_case("readonly");
                }
                _ => {
                    tracing::debug!(key, value, "ignoring unknown connection string option");
                }
            }
        }

        Ok(config)
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the username and password.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Enable NTLM authentication for the given domain (TDS only).
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the workstation name advertised in the NTLM authenticate
    /// message (TDS only, ignored unless [`Config::domain`] is set).
    #[must_use]
    pub fn workstation(mut self, workstation: impl Into<String>) -> Self {
        self.workstation = workstation.into();
        self
    }

    /// Set the application name reported to the server (TDS only).
    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the TLS negotiation policy.
    #[must_use]
    pub fn tls(mut self, policy: TlsPolicy) -> Self {
        self.tls = policy;
        self
    }

    /// Set trust-server-certificate.
    #[must_use]
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    /// Set the timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration before connecting.
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.domain.is_some() && self.engine != Engine::Tds {
            return Err(Error::Config("domain (NTLM) is only supported by the TDS engine".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_port_per_engine() {
        assert_eq!(Config::new(Engine::Tds).port, 1433);
        assert_eq!(Config::new(Engine::Postgres).port, 5432);
        assert_eq!(Config::new(Engine::MySql).port, 3306);
    }

    #[test]
    fn connection_string_parsing() {
        let config = Config::from_connection_string(
            "Server=localhost;Database=test;User Id=sa;Password=secret;",
        )
        .unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.database, Some("test".to_string()));
        assert_eq!(config.username, "sa");
    }

    #[test]
    fn connection_string_with_port() {
        let config = Config::from_connection_string("Server=localhost,1434;").unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1434);
    }

    #[test]
    fn connection_string_enables_ntlm_via_domain() {
        let config = Config::from_connection_string("Server=host;Domain=CORP;").unwrap();
        assert_eq!(config.domain.as_deref(), Some("CORP"));
    }

    #[test]
    fn retry_policy_backoff_caps_at_max() {
        let policy = RetryPolicy::new()
            .initial_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_secs(1))
            .backoff_multiplier(10.0);
        assert_eq!(policy.backoff_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_secs(1));
    }

    #[test]
    fn domain_rejected_for_non_tds_engines() {
        let config = Config::new(Engine::Postgres).domain("CORP");
        assert!(config.validate().is_err());
    }
}
