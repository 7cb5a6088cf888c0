//! Simple-query protocol: client-side `$N` placeholder substitution and
//! literal escaping.
//!
//! PostgreSQL's simple-query message (`Q`) carries a complete, literal SQL
//! string — there is no server-side parameter binding in this path, so
//! placeholders are rewritten into SQL literals before the string is sent.
//! Substitution runs in descending parameter-number order so `$1` doesn't
//! clobber a `$1` inside `$10`.

use sql_core::{SqlParameter, SqlValue};

use crate::error::ProtocolError;

/// Rewrite every `$N` placeholder in `query` with the literal SQL text for
/// the matching 1-indexed parameter.
pub fn substitute_placeholders(
    query: &str,
    params: &[SqlParameter],
) -> Result<String, ProtocolError> {
    let mut result = query.to_owned();
    let mut indices: Vec<usize> = (1..=params.len()).collect();
    indices.sort_unstable_by(|a, b| b.cmp(a));

    for n in indices {
        let placeholder = format!("${n}");
        if !result.contains(&placeholder) {
            continue;
        }
        let literal = escape_literal(&params[n - 1].value);
        result = result.replace(&placeholder, &literal);
    }
    Ok(result)
}

/// Render a value as a SQL literal safe to splice into query text.
#[must_use]
pub fn escape_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_owned(),
        SqlValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_owned(),
        SqlValue::Int8(v) => v.to_string(),
        SqlValue::Int16(v) => v.to_string(),
        SqlValue::Int32(v) => v.to_string(),
        SqlValue::Int64(v) => v.to_string(),
        SqlValue::Float32(v) => v.to_string(),
        SqlValue::Float64(v) => v.to_string(),
        SqlValue::Decimal(v) => v.to_string(),
        SqlValue::Text(s) => quote_string_literal(s),
        SqlValue::Bytes(b) => format!("E'\\\\x{}'::bytea", hex(b)),
        SqlValue::Uuid(u) => format!("'{u}'::uuid"),
        SqlValue::Instant(dt) => format!("'{}'::timestamptz", dt.to_rfc3339()),
        _ => quote_string_literal(&format!("{value:?}")),
    }
}

/// Quote a string literal, doubling embedded single quotes (the
/// `standard_conforming_strings` escaping PostgreSQL expects by default).
#[must_use]
pub fn quote_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_descending_so_dollar_one_does_not_clobber_dollar_ten() {
        let params: Vec<SqlParameter> = (1..=10)
            .map(|i| SqlParameter::from_value(format!("${i}"), SqlValue::Int32(i)))
            .collect();
        let query = "select $10, $1";
        let out = substitute_placeholders(query, &params).unwrap();
        assert_eq!(out, "select 10, 1");
    }

    #[test]
    fn escapes_embedded_quotes() {
        assert_eq!(quote_string_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn null_renders_bare() {
        assert_eq!(escape_literal(&SqlValue::Null), "NULL");
    }
}
