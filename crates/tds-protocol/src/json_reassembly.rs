//! Reassembly of `SELECT ... FOR JSON` text chunks into complete objects.
//!
//! `FOR JSON` queries return their result as a stream of text chunks (TDS
//! rows of a single NVARCHAR(MAX) column) whose boundaries have nothing to
//! do with JSON object boundaries — a single object can straddle several
//! chunks, and a single chunk can hold several objects. [`JsonAssembler`]
//! is fed chunks in order and emits each top-level `{...}` object as soon
//! as it closes, by tracking brace depth with awareness of `"`-delimited
//! strings and `\`-escape sequences so braces inside string literals don't
//! affect the count.
//!
//! The assembler is stateful but not re-entrant: create one per query.

use crate::prelude::*;

/// Byte-level assembler that turns a stream of `FOR JSON` text chunks into
/// complete top-level JSON objects.
///
/// Only `{...}` objects are recognised as top-level units, matching
/// `FOR JSON`'s array-of-objects (or single-object, for `FOR JSON ...,
/// WITHOUT_ARRAY_WRAPPER`) output shape. Whitespace and the enclosing `[`/`]`
/// array brackets, if present, are skipped rather than buffered.
#[derive(Debug, Default)]
pub struct JsonAssembler {
    buf: String,
    depth: u32,
    in_string: bool,
    escaped: bool,
    object_start: Option<usize>,
}

impl JsonAssembler {
    /// Create a new assembler with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk, returning every object completed by it, in order.
    ///
    /// Chunks must be fed in the order the server sent them; object text
    /// that began in an earlier chunk is buffered internally and returned
    /// whole once it closes.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<String> {
        let mut completed = Vec::new();
        for ch in chunk.chars() {
            let start = self.buf.len();
            if self.depth > 0 {
                self.buf.push(ch);
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if ch == '\\' {
                    self.escaped = true;
                } else if ch == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match ch {
                '"' => self.in_string = true,
                '{' => {
                    if self.depth == 0 {
                        self.object_start = Some(start);
                        self.buf.push(ch);
                    }
                    self.depth += 1;
                }
                '}' => {
                    debug_assert!(self.depth > 0, "unbalanced '}}' in FOR JSON output");
                    if self.depth > 0 {
                        self.depth -= 1;
                    }
                    if self.depth == 0 && self.object_start.is_some() {
                        completed.push(core::mem::take(&mut self.buf));
                        self.object_start = None;
                    }
                }
                _ => {}
            }
        }
        completed
    }

    /// `true` if no partial object is buffered — the assembler is between
    /// top-level objects and safe to drop.
    pub fn is_complete(&self) -> bool {
        self.depth == 0 && self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_single_object() {
        let mut asm = JsonAssembler::new();
        let objects = asm.push_chunk(r#"[{"a":1}]"#);
        assert_eq!(objects, vec![r#"{"a":1}"#.to_string()]);
        assert!(asm.is_complete());
    }

    #[test]
    fn object_split_across_chunks() {
        let mut asm = JsonAssembler::new();
        assert!(asm.push_chunk(r#"[{"a":"#).is_empty());
        assert!(!asm.is_complete());
        let objects = asm.push_chunk(r#"1,"b":2}]"#);
        assert_eq!(objects, vec![r#"{"a":1,"b":2}"#.to_string()]);
        assert!(asm.is_complete());
    }

    #[test]
    fn brace_inside_string_does_not_affect_depth() {
        let mut asm = JsonAssembler::new();
        let objects = asm.push_chunk(r#"[{"note":"a { b } c"}]"#);
        assert_eq!(objects, vec![r#"{"note":"a { b } c"}"#.to_string()]);
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        let mut asm = JsonAssembler::new();
        let objects = asm.push_chunk(r#"[{"note":"a \" b"}]"#);
        assert_eq!(objects, vec![r#"{"note":"a \" b"}"#.to_string()]);
    }

    #[test]
    fn multiple_objects_in_order() {
        let mut asm = JsonAssembler::new();
        let objects = asm.push_chunk(r#"[{"id":1},{"id":2},{"id":3}]"#);
        assert_eq!(
            objects,
            vec![
                r#"{"id":1}"#.to_string(),
                r#"{"id":2}"#.to_string(),
                r#"{"id":3}"#.to_string(),
            ]
        );
    }

    #[test]
    fn state_resets_between_objects() {
        let mut asm = JsonAssembler::new();
        asm.push_chunk(r#"[{"id":1}"#);
        assert!(asm.is_complete());
        assert_eq!(asm.depth, 0);
        assert!(!asm.in_string);
        assert!(!asm.escaped);
    }

    #[test]
    fn chunking_is_order_preserving_and_byte_equivalent_to_whole_input() {
        let whole = r#"[{"a":1},{"b":"x\"y"},{"c":{"nested":true}}]"#;
        let mut single = JsonAssembler::new();
        let one_shot = single.push_chunk(whole);

        let mut streamed = JsonAssembler::new();
        let mut piecemeal = Vec::new();
        for byte_chunk in whole.as_bytes().chunks(3) {
            piecemeal.extend(streamed.push_chunk(core::str::from_utf8(byte_chunk).unwrap_or("")));
        }

        assert_eq!(one_shot, piecemeal);
    }

    #[test]
    fn nested_object_kept_whole() {
        let mut asm = JsonAssembler::new();
        let objects = asm.push_chunk(r#"[{"a":{"b":{"c":1}}}]"#);
        assert_eq!(objects, vec![r#"{"a":{"b":{"c":1}}}"#.to_string()]);
    }
}
