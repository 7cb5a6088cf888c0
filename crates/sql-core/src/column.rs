//! Column metadata shared across result sets.

/// Describes one column of a result set, independent of wire engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlColumn {
    /// Column name as reported by the server. Empty for unnamed expressions.
    pub name: String,
    /// Source table name, when the server reports one.
    pub table_name: Option<String>,
    /// Engine-specific type identifier (TDS type byte, PostgreSQL OID, or
    /// MySQL column type). Kept opaque here; engines interpret their own ids.
    pub type_id: u32,
    /// Whether the server allows NULL in this column.
    pub nullable: bool,
}

impl SqlColumn {
    /// Build a column descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, type_id: u32, nullable: bool) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            type_id,
            nullable,
        }
    }

    /// Attach a source table name.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_table_name() {
        let col = SqlColumn::new("id", 56, false).with_table_name("users");
        assert_eq!(col.table_name.as_deref(), Some("users"));
        assert!(!col.nullable);
    }
}
