//! Bound query parameters.

use crate::error::TypeError;
use crate::to_sql::ToSql;
use crate::value::SqlValue;

/// A single bound parameter.
///
/// TDS RPC calls and PostgreSQL/MySQL prepared statements all take named or
/// positional placeholders; `name` carries the placeholder text (`"@p1"`,
/// `"$1"`, `"?"`-position label) an engine needs to build its own wire form.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    /// Placeholder name, e.g. `"@user_id"`.
    pub name: String,
    /// The bound value.
    pub value: SqlValue,
    /// Whether the server should populate this parameter on return
    /// (TDS output parameters; ignored by engines without the concept).
    pub output: bool,
}

impl SqlParameter {
    /// Bind a named input parameter from any [`ToSql`] value.
    pub fn new(name: impl Into<String>, value: impl ToSql) -> Result<Self, TypeError> {
        Ok(Self {
            name: name.into(),
            value: value.to_sql()?,
            output: false,
        })
    }

    /// Bind a named parameter directly from an already-converted [`SqlValue`].
    #[must_use]
    pub fn from_value(name: impl Into<String>, value: SqlValue) -> Self {
        Self {
            name: name.into(),
            value,
            output: false,
        }
    }

    /// Mark this parameter as an output parameter.
    #[must_use]
    pub fn as_output(mut self) -> Self {
        self.output = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_converts_via_to_sql() {
        let p = SqlParameter::new("@id", 5i32).unwrap();
        assert_eq!(p.value, SqlValue::Int32(5));
        assert!(!p.output);
    }

    #[test]
    fn as_output_flips_flag() {
        let p = SqlParameter::from_value("@out", SqlValue::Null).as_output();
        assert!(p.output);
    }
}
