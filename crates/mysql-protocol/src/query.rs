//! `COM_QUERY` text protocol: client-side `?` placeholder substitution and
//! literal escaping.
//!
//! MySQL's `COM_QUERY` carries a complete literal SQL string, same as
//! PostgreSQL's simple-query protocol; there's no separate binary-bind
//! path used here. Placeholders are positional `?` markers substituted in
//! order (MySQL has no numbered-placeholder syntax to worry about, unlike
//! PostgreSQL's `$N`).

use sql_core::{SqlParameter, SqlValue};

use crate::error::ProtocolError;

/// Replace each `?` placeholder, in order, with the literal SQL text for
/// the matching parameter.
pub fn substitute_placeholders(
    query: &str,
    params: &[SqlParameter],
) -> Result<String, ProtocolError> {
    let mut result = String::with_capacity(query.len());
    let mut param_iter = params.iter();
    let mut in_string = false;
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_string => {
                in_string = true;
                result.push(c);
            }
            '\'' if in_string => {
                in_string = false;
                result.push(c);
            }
            '?' if !in_string => {
                let param = param_iter
                    .next()
                    .ok_or(ProtocolError::MissingParameter(result.matches('?').count()))?;
                result.push_str(&escape_literal(&param.value));
            }
            other => result.push(other),
        }
    }
    Ok(result)
}

/// Render a value as a SQL literal safe to splice into query text.
#[must_use]
pub fn escape_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_owned(),
        SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_owned(),
        SqlValue::Int8(v) => v.to_string(),
        SqlValue::Int16(v) => v.to_string(),
        SqlValue::Int32(v) => v.to_string(),
        SqlValue::Int64(v) => v.to_string(),
        SqlValue::Float32(v) => v.to_string(),
        SqlValue::Float64(v) => v.to_string(),
        SqlValue::Decimal(v) => v.to_string(),
        SqlValue::Text(s) => quote_string_literal(s),
        SqlValue::Bytes(b) => format!("X'{}'", hex(b)),
        SqlValue::Uuid(u) => quote_string_literal(&u.to_string()),
        SqlValue::Instant(dt) => quote_string_literal(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        _ => quote_string_literal(&format!("{value:?}")),
    }
}

/// Quote a string literal, escaping backslashes, single quotes and the
/// control characters MySQL's default `NO_BACKSLASH_ESCAPES`-off mode
/// requires.
#[must_use]
pub fn quote_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
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
    fn substitutes_positional_placeholders_in_order() {
        let params = vec![
            SqlParameter::from_value("1", SqlValue::Int32(1)),
            SqlParameter::from_value("2", SqlValue::Text("a".into())),
        ];
        let out = substitute_placeholders("select ?, ?", &params).unwrap();
        assert_eq!(out, "select 1, 'a'");
    }

    #[test]
    fn ignores_question_marks_inside_string_literals() {
        let params = vec![SqlParameter::from_value("1", SqlValue::Int32(5))];
        let out = substitute_placeholders("select '?', ?", &params).unwrap();
        assert_eq!(out, "select '?', 5");
    }

    #[test]
    fn escapes_backslash_and_quote() {
        assert_eq!(quote_string_literal("a'b\\c"), "'a\\'b\\\\c'");
    }
}
