//! Parameter binding for `query`/`execute`/`call_procedure`.
//!
//! Every engine here takes the same [`sql_core::SqlParameter`] list; only
//! the placeholder syntax in the SQL text differs (`@p1` for TDS, `$1` for
//! PostgreSQL, `?` for MySQL — positional, left to the caller to write).
//! [`Params`] exists so callers don't have to name parameters by hand:
//! `@p1`/`@p2`/... works everywhere, since PostgreSQL and MySQL bind by
//! position and never look at a parameter's name.

use sql_core::error::TypeError;
use sql_core::{SqlParameter, ToSql};

/// An ordered list of bound parameters, built up with [`Params::bind`].
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: Vec<SqlParameter>,
}

impl Params {
    /// An empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the next positional parameter. Named `@p1`, `@p2`, ... in
    /// binding order — use that name in TDS SQL text; PostgreSQL's `$N`
    /// and MySQL's `?` ignore it and bind by position instead.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError`] if `value`'s [`ToSql`] conversion fails.
    pub fn bind<T: ToSql>(mut self, value: T) -> Result<Self, TypeError> {
        let name = format!("@p{}", self.values.len() + 1);
        self.values.push(SqlParameter::new(name, value)?);
        Ok(self)
    }

    /// Bind a parameter the caller will read back via `OUTPUT`/`OUT`
    /// (TDS/MySQL stored-procedure parameters; unsupported by this crate's
    /// PostgreSQL path, which has no output-parameter concept in the
    /// simple-query protocol).
    pub fn bind_output<T: ToSql>(mut self, value: T) -> Result<Self, TypeError> {
        let name = format!("@p{}", self.values.len() + 1);
        self.values.push(SqlParameter::new(name, value)?.as_output());
        Ok(self)
    }

    /// The bound parameters, in binding order.
    #[must_use]
    pub fn into_vec(self) -> Vec<SqlParameter> {
        self.values
    }

    /// Borrow the bound parameters.
    #[must_use]
    pub fn as_slice(&self) -> &[SqlParameter] {
        &self.values
    }
}

impl From<Params> for Vec<SqlParameter> {
    fn from(params: Params) -> Self {
        params.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_names_positionally() {
        let params = Params::new().bind(42i32).unwrap().bind("Alice").unwrap();
        let values = params.into_vec();
        assert_eq!(values[0].name, "@p1");
        assert_eq!(values[1].name, "@p2");
    }

    #[test]
    fn bind_output_marks_parameter() {
        let params = Params::new().bind_output(0i32).unwrap().into_vec();
        assert!(params[0].output);
    }

    #[test]
    fn empty_params_round_trips() {
        let params: Vec<SqlParameter> = Params::new().into();
        assert!(params.is_empty());
    }
}
