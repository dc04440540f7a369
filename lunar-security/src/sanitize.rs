//! Escaping of query metacharacters for literal embedding.
//!
//! [`sanitize`] produces a copy of its input in which every character with a
//! special meaning inside a quoted SQL literal is preceded by a backslash:
//!
//! | Input                         | Output       |
//! |-------------------------------|--------------|
//! | `'`                           | `\'`         |
//! | `"`                           | `\"`         |
//! | `\`                           | `\\`         |
//! | NUL                           | `\0`         |
//! | `;`                           | `\;`         |
//! | LF / CR                       | `\n` / `\r`  |
//! | SUB (0x1A)                    | `\Z`         |
//! | `-` next to another `-`       | `\-`         |
//! | `/` next to `*`, `*` next to `/` | `\/`, `\*` |
//!
//! Every character maps to at most two, so the output is never longer than
//! [`MAX_ESCAPE_GROWTH`](crate::constants::MAX_ESCAPE_GROWTH) times the input.
//! Escaping is **not** idempotent: sanitize raw input exactly once.
//!
//! Prefer [`PreparedStatement`](crate::PreparedStatement), which applies this
//! table to every bound parameter on its own.
//!
//! # Example
//!
//! ```
//! use lunar_security::sanitize;
//!
//! assert_eq!(sanitize("O'Brien"), r"O\'Brien");
//! assert_eq!(sanitize("1; --"), r"1\; \-\-");
//! assert_eq!(sanitize("plain text"), "plain text");
//! ```

use crate::constants::MAX_ESCAPE_GROWTH;
use std::borrow::Cow;

/// Escape query metacharacters in `input`.
///
/// Never fails; empty input yields an empty string. Input without any
/// character from the escaping table is returned unchanged.
#[must_use]
pub fn sanitize(input: &str) -> String {
    escape(input).into_owned()
}

/// Borrow `input` when nothing needs escaping.
pub(crate) fn escape(input: &str) -> Cow<'_, str> {
    if !needs_escaping(input) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len().saturating_mul(MAX_ESCAPE_GROWTH));
    escape_into(&mut out, input);
    Cow::Owned(out)
}

/// Whether [`sanitize`] would change `input`.
#[must_use]
pub fn needs_escaping(input: &str) -> bool {
    let mut prev = None;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if escape_for(prev, c, chars.peek().copied()).is_some() {
            return true;
        }
        prev = Some(c);
    }
    false
}

/// Append the escaped form of `input` to `out`.
pub(crate) fn escape_into(out: &mut String, input: &str) {
    let mut prev = None;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match escape_for(prev, c, chars.peek().copied()) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
        prev = Some(c);
    }
}

/// Look up the replacement for `c`, given its neighbours.
///
/// Comment markers are context dependent: a lone `-` or `/` is harmless and
/// passes through, only the pairs `--`, `/*` and `*/` are broken up.
#[inline]
const fn escape_for(prev: Option<char>, c: char, next: Option<char>) -> Option<&'static str> {
    match c {
        '\'' => Some(r"\'"),
        '"' => Some(r#"\""#),
        '\\' => Some(r"\\"),
        '\0' => Some(r"\0"),
        ';' => Some(r"\;"),
        '\n' => Some(r"\n"),
        '\r' => Some(r"\r"),
        '\u{1a}' => Some(r"\Z"),
        '-' if matches!(prev, Some('-')) || matches!(next, Some('-')) => Some(r"\-"),
        '/' if matches!(prev, Some('*')) || matches!(next, Some('*')) => Some(r"\/"),
        '*' if matches!(prev, Some('/')) || matches!(next, Some('/')) => Some(r"\*"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
        assert!(!needs_escaping(""));
    }

    #[test]
    fn test_escape_borrows_clean_input() {
        assert!(matches!(escape("plain"), Cow::Borrowed("plain")));
        assert!(matches!(escape("it's"), Cow::Owned(_)));
    }

    #[test]
    fn test_clean_input_unchanged() {
        for s in ["hello", "SELECT name FROM users", "a-b", "3 * 4 / 2", "user@example.com"] {
            assert_eq!(sanitize(s), s);
            assert!(!needs_escaping(s), "{s} should not need escaping");
        }
    }

    #[test]
    fn test_quotes_and_backslash() {
        assert_eq!(sanitize("it's"), r"it\'s");
        assert_eq!(sanitize(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(sanitize(r"C:\path"), r"C:\\path");
        // A pre-escaped quote cannot swallow the escaping backslash
        assert_eq!(sanitize(r"\'"), r"\\\'");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(sanitize("a\0b"), r"a\0b");
        assert_eq!(sanitize("line1\nline2\r"), r"line1\nline2\r");
        assert_eq!(sanitize("x\u{1a}y"), r"x\Zy");
    }

    #[test]
    fn test_semicolon() {
        assert_eq!(sanitize("a;b;"), r"a\;b\;");
    }

    #[test]
    fn test_line_comment() {
        assert_eq!(sanitize("--"), r"\-\-");
        assert_eq!(sanitize("a---b"), r"a\-\-\-b");
        assert_eq!(sanitize("well-known"), "well-known");
    }

    #[test]
    fn test_block_comment() {
        assert_eq!(sanitize("/* x */"), r"\/\* x \*\/");
        assert_eq!(sanitize("/*/"), r"\/\*\/");
        assert_eq!(sanitize("a / b * c"), "a / b * c");
    }

    #[test]
    fn test_classic_payload() {
        let out = sanitize("'; DROP TABLE users; --");
        assert_eq!(out, r"\'\; DROP TABLE users\; \-\-");
        assert!(!out.contains("--"));
    }

    #[test]
    fn test_not_idempotent() {
        let once = sanitize("'");
        let twice = sanitize(&once);
        assert_eq!(once, r"\'");
        assert_eq!(twice, r"\\\'");
    }

    #[test]
    fn test_growth_bound() {
        let input = "';\\\"\0--/**/";
        let out = sanitize(input);
        assert!(out.len() <= input.len() * MAX_ESCAPE_GROWTH);
    }

    #[test]
    fn test_unicode_passthrough() {
        assert_eq!(sanitize("héllo wörld ✓"), "héllo wörld ✓");
        assert_eq!(sanitize("名前'"), r"名前\'");
    }
}
