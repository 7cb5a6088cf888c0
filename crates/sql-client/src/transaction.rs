//! Transaction support.
//!
//! Transaction state is a flag on the connection, not a nested stack:
//! starting a transaction while one is already open, or committing/
//! rolling back with none open, is a caller error. Savepoints and nested
//! transactions aren't implemented — every engine here treats a
//! transaction as flat BEGIN/COMMIT/ROLLBACK.

use crate::config::Engine;

/// Transaction isolation level.
///
/// The four SQL standard levels, supported (with minor syntax differences)
/// by every engine here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Dirty reads allowed. Best performance, no consistency guarantees.
    ReadUncommitted,

    /// Default on every engine here. Prevents dirty reads; allows
    /// non-repeatable and phantom reads.
    #[default]
    ReadCommitted,

    /// Prevents dirty and non-repeatable reads; allows phantom reads.
    RepeatableRead,

    /// Strictest isolation; highest lock contention.
    Serializable,
}

impl IsolationLevel {
    /// The `SET TRANSACTION ISOLATION LEVEL ...` statement for this level.
    /// Identical syntax across TDS, PostgreSQL, and MySQL.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED",
            Self::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }

    /// The isolation level name, as it reads in `SET TRANSACTION ...`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// The `BEGIN`-equivalent statement, which differs across engines
/// (`BEGIN TRANSACTION` for TDS, `START TRANSACTION` for MySQL, `BEGIN`
/// for PostgreSQL). `COMMIT` and `ROLLBACK` are spelled the same
/// everywhere.
#[must_use]
pub fn begin_statement(engine: Engine) -> &'static str {
    match engine {
        Engine::Tds => "BEGIN TRANSACTION",
        Engine::Postgres => "BEGIN",
        Engine::MySql => "START TRANSACTION",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_level_sql() {
        assert_eq!(
            IsolationLevel::ReadCommitted.as_sql(),
            "SET TRANSACTION ISOLATION LEVEL READ COMMITTED"
        );
        assert_eq!(
            IsolationLevel::Serializable.as_sql(),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"
        );
    }

    #[test]
    fn default_isolation_level_is_read_committed() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn begin_statement_differs_per_engine() {
        assert_eq!(begin_statement(Engine::Tds), "BEGIN TRANSACTION");
        assert_eq!(begin_statement(Engine::Postgres), "BEGIN");
        assert_eq!(begin_statement(Engine::MySql), "START TRANSACTION");
    }
}
