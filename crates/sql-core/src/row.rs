//! A single decoded row, paired with the shared column list of its result set.

use std::sync::Arc;

use crate::column::SqlColumn;
use crate::error::TypeError;
use crate::from_sql::FromSql;
use crate::value::SqlValue;

/// One row of a result set.
///
/// Columns are shared (via `Arc`) across every row of the same result set
/// rather than duplicated per row, since an engine decodes one `ColMetaData`
/// (or `RowDescription`, or column-definition packet) per set, not per row.
#[derive(Debug, Clone)]
pub struct SqlRow {
    columns: Arc<Vec<SqlColumn>>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    /// Build a row from a shared column list and its values.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != columns.len()`. Engines build rows from a
    /// trusted decode step where this invariant always holds by construction.
    #[must_use]
    pub fn new(columns: Arc<Vec<SqlColumn>>, values: Vec<SqlValue>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "row value count must match column count"
        );
        Self { columns, values }
    }

    /// The column descriptors for this row's result set.
    #[must_use]
    pub fn columns(&self) -> &[SqlColumn] {
        &self.columns
    }

    /// Number of columns (and values) in this row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at a positional index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Raw value by column name, case-insensitive, first match wins.
    ///
    /// Returns `None` (not an error) when no column matches, mirroring how
    /// the underlying engines treat an absent column as distinct from NULL.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&SqlValue> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))?;
        self.values.get(index)
    }

    /// Decode the value at `index` into `T`.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        let value = self.get(index).ok_or(TypeError::OutOfRange {
            target_type: std::any::type_name::<T>(),
        })?;
        T::from_sql(value)
    }

    /// Decode the named column into `T`.
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        let value = self
            .get_by_name(name)
            .ok_or_else(|| TypeError::InvalidEncoding(format!("no column named {name:?}")))?;
        T::from_sql(value)
    }

    /// Values in column order, consuming the row.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> SqlRow {
        let columns = Arc::new(vec![
            SqlColumn::new("Id", 56, false),
            SqlColumn::new("Name", 231, true),
        ]);
        SqlRow::new(columns, vec![SqlValue::Int32(1), SqlValue::Text("a".into())])
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let row = sample_row();
        assert_eq!(row.get_by_name("id"), Some(&SqlValue::Int32(1)));
        assert_eq!(row.get_by_name("NAME"), Some(&SqlValue::Text("a".into())));
        assert_eq!(row.get_by_name("missing"), None);
    }

    #[test]
    fn try_get_decodes() {
        let row = sample_row();
        let id: i32 = row.try_get(0).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    #[should_panic(expected = "row value count must match column count")]
    fn mismatched_lengths_panic() {
        let columns = Arc::new(vec![SqlColumn::new("a", 1, false)]);
        SqlRow::new(columns, vec![SqlValue::Int32(1), SqlValue::Int32(2)]);
    }
}
