//! Query outcome types returned across every wire engine.

use std::collections::HashMap;

use crate::row::SqlRow;
use crate::value::SqlValue;

/// One result set: its rows plus the number of rows the server reports as
/// affected for that set (TDS `DONE` row count; PostgreSQL `CommandComplete`
/// tag; MySQL OK packet `affected_rows`).
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// Decoded rows in server order.
    pub rows: Vec<SqlRow>,
    /// Rows affected, when the server reports a count for this set.
    pub rows_affected: Option<u64>,
}

/// The full outcome of executing one statement or batch.
///
/// A batch can produce more than one result set (multiple `SELECT`s, or a
/// stored procedure mixing `SELECT`s with output parameters); callers that
/// only care about the first set can use [`ResultBatch::rows`].
#[derive(Debug, Clone, Default)]
pub struct ResultBatch {
    /// Every result set produced, in server order.
    pub sets: Vec<ResultSet>,
    /// Output parameter values populated by the server, by placeholder name
    /// (TDS `RETURNVALUE` tokens; empty for engines with no such concept).
    pub output_params: HashMap<String, SqlValue>,
    /// Stored procedure return status (TDS `RETURNSTATUS`); `None` for a
    /// plain statement or an engine without the concept.
    pub return_status: Option<i32>,
    /// Informational messages raised during execution (TDS `INFO` tokens,
    /// PostgreSQL `NOTICE`), in the order received.
    pub info_messages: Vec<String>,
}

impl ResultBatch {
    /// Rows of the first result set, or an empty slice if there were none.
    #[must_use]
    pub fn rows(&self) -> &[SqlRow] {
        self.sets.first().map_or(&[], |s| &s.rows[..])
    }

    /// Total rows affected across every result set that reported a count.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.sets.iter().filter_map(|s| s.rows_affected).sum()
    }

    /// True if no result set produced any rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(|s| s.rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::SqlColumn;
    use std::sync::Arc;

    #[test]
    fn rows_affected_sums_every_set() {
        let batch = ResultBatch {
            sets: vec![
                ResultSet {
                    rows: vec![],
                    rows_affected: Some(2),
                },
                ResultSet {
                    rows: vec![],
                    rows_affected: Some(3),
                },
            ],
            ..Default::default()
        };
        assert_eq!(batch.rows_affected(), 5);
    }

    #[test]
    fn rows_defaults_to_first_set() {
        let columns = Arc::new(vec![SqlColumn::new("x", 1, false)]);
        let row = SqlRow::new(columns, vec![SqlValue::Int32(1)]);
        let batch = ResultBatch {
            sets: vec![ResultSet {
                rows: vec![row],
                rows_affected: None,
            }],
            ..Default::default()
        };
        assert_eq!(batch.rows().len(), 1);
        assert!(!batch.is_empty());
    }

    #[test]
    fn empty_batch_has_no_rows() {
        assert!(ResultBatch::default().is_empty());
        assert_eq!(ResultBatch::default().rows().len(), 0);
    }
}
