//! Streaming adapters over an already-materialized [`ResultBatch`].
//!
//! None of the three engines here expose a true incremental cursor through
//! this crate's simple-query path (TDS's token stream, PostgreSQL's
//! `Q`-message response, and MySQL's `COM_QUERY` text protocol are all
//! consumed to their terminal token by [`crate::SqlConnection::query`]
//! before a [`ResultBatch`] exists at all). What these types stream is the
//! *consumption* of that batch: a caller processing a huge result set still
//! gets a `Stream` rather than a `Vec`, so memory stays bounded to one row
//! at a time.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use sql_core::{ResultBatch, SqlColumn, SqlRow};

use crate::error::Error;

/// A stream over the rows of a single result set.
pub struct QueryStream {
    columns: Vec<SqlColumn>,
    rows: std::vec::IntoIter<SqlRow>,
}

impl QueryStream {
    /// Wrap a result set's rows for streaming consumption.
    #[must_use]
    pub fn new(columns: Vec<SqlColumn>, rows: Vec<SqlRow>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }

    /// Column metadata for this result set.
    #[must_use]
    pub fn columns(&self) -> &[SqlColumn] {
        &self.columns
    }

    /// True if every row has already been yielded.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.rows.len() == 0
    }

    /// Collect every remaining row into a `Vec`.
    pub async fn collect_all(mut self) -> Result<Vec<SqlRow>, Error> {
        Ok(self.rows.by_ref().collect())
    }
}

impl Stream for QueryStream {
    type Item = Result<SqlRow, Error>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().rows.next().map(Ok))
    }
}

/// Result of a non-query execution: rows affected plus any output
/// parameters the server returned (TDS `RETURNVALUE`, MySQL `OUT`
/// parameters via session variables — PostgreSQL's simple-query protocol
/// has no output-parameter concept).
#[derive(Debug, Clone, Default)]
pub struct ExecuteResult {
    /// Number of rows affected by the statement.
    pub rows_affected: u64,
    /// Output parameters from a stored procedure call, by name.
    pub output_params: Vec<OutputParam>,
}

/// An output parameter from a stored procedure call.
#[derive(Debug, Clone)]
pub struct OutputParam {
    /// Parameter name, as declared by the caller.
    pub name: String,
    /// The value the server returned.
    pub value: sql_core::SqlValue,
}

impl ExecuteResult {
    /// Build a result from a completed [`ResultBatch`].
    #[must_use]
    pub fn from_batch(batch: &ResultBatch) -> Self {
        Self {
            rows_affected: batch.rows_affected(),
            output_params: batch
                .output_params
                .iter()
                .map(|(name, value)| OutputParam {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    /// Look up an output parameter by name, case-insensitive.
    #[must_use]
    pub fn get_output(&self, name: &str) -> Option<&OutputParam> {
        self.output_params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Multiple result sets from a batch or stored procedure, exposed as a
/// cursor over [`ResultBatch::sets`] rather than a single flat row list.
pub struct MultiResultStream {
    sets: std::vec::IntoIter<sql_core::ResultSet>,
    current: Option<QueryStream>,
}

impl MultiResultStream {
    /// Wrap a completed batch's result sets for sequential consumption.
    #[must_use]
    pub fn new(batch: ResultBatch) -> Self {
        Self {
            sets: batch.sets.into_iter(),
            current: None,
        }
    }

    /// Advance to the next result set. Returns `false` once exhausted.
    pub async fn next_result(&mut self) -> Result<bool, Error> {
        match self.sets.next() {
            Some(set) => {
                let columns = set
                    .rows
                    .first()
                    .map(|row| row.columns().to_vec())
                    .unwrap_or_default();
                self.current = Some(QueryStream::new(columns, set.rows));
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    /// The next row of the current result set, or `None` once it's
    /// exhausted (call [`Self::next_result`] to move to the following set).
    pub async fn next_row(&mut self) -> Result<Option<SqlRow>, Error> {
        match &mut self.current {
            Some(stream) => Ok(stream.rows.next()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_core::Stream;
    use sql_core::{ResultSet, SqlValue};

    use super::*;

    fn sample_rows() -> (Vec<SqlColumn>, Vec<SqlRow>) {
        let columns = Arc::new(vec![SqlColumn::new("id", 56, false)]);
        let rows = vec![
            SqlRow::new(columns.clone(), vec![SqlValue::Int32(1)]),
            SqlRow::new(columns.clone(), vec![SqlValue::Int32(2)]),
        ];
        ((*columns).clone(), rows)
    }

    #[tokio::test]
    async fn query_stream_collects_all_rows() {
        let (columns, rows) = sample_rows();
        let stream = QueryStream::new(columns, rows);
        let collected = stream.collect_all().await.unwrap();
        assert_eq!(collected.len(), 2);
    }

    #[tokio::test]
    async fn query_stream_yields_rows_in_order_then_ends() {
        use futures_util::StreamExt;

        let (columns, rows) = sample_rows();
        let mut stream = QueryStream::new(columns, rows);
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn multi_result_stream_walks_every_set() {
        let (_columns, rows) = sample_rows();
        let batch = ResultBatch {
            sets: vec![
                ResultSet {
                    rows: rows.clone(),
                    rows_affected: Some(2),
                },
                ResultSet {
                    rows: vec![],
                    rows_affected: Some(0),
                },
            ],
            ..Default::default()
        };
        let mut stream = MultiResultStream::new(batch);

        assert!(stream.next_result().await.unwrap());
        assert!(stream.next_row().await.unwrap().is_some());
        assert!(stream.next_row().await.unwrap().is_some());
        assert!(stream.next_row().await.unwrap().is_none());

        assert!(stream.next_result().await.unwrap());
        assert!(stream.next_row().await.unwrap().is_none());

        assert!(!stream.next_result().await.unwrap());
    }

    #[test]
    fn execute_result_looks_up_output_params_case_insensitively() {
        let batch = ResultBatch {
            output_params: [("RetVal".to_string(), SqlValue::Int32(7))]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let result = ExecuteResult::from_batch(&batch);
        assert!(result.get_output("retval").is_some());
    }
}
