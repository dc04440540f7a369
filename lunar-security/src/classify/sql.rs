//! SQL injection signatures.

use super::{InjectionKind, is_ident_byte, is_word_end, is_word_start};
use crate::constants::{COMMENT_SEQUENCES, STACKED_STATEMENT_KEYWORDS, TAUTOLOGY_LOOKAHEAD};

/// Find the first SQL injection signature in `input`.
///
/// Signatures are tried in a fixed order: stacked statements, comment
/// sequences, `UNION SELECT`, tautologies.
///
/// # Examples
///
/// ```
/// use lunar_security::{InjectionKind, sql_threat};
///
/// assert_eq!(sql_threat("Robert"), None);
/// assert_eq!(sql_threat("1; delete from t"), Some(InjectionKind::StackedQuery));
/// assert_eq!(sql_threat("admin'--"), Some(InjectionKind::CommentSequence));
/// assert_eq!(sql_threat("0 UNION ALL SELECT pw"), Some(InjectionKind::UnionSelect));
/// assert_eq!(sql_threat("' or 'a'='a"), Some(InjectionKind::Tautology));
/// ```
#[must_use]
pub fn sql_threat(input: &str) -> Option<InjectionKind> {
    if input.is_empty() {
        return None;
    }

    // ASCII lowercasing keeps byte offsets stable
    let lower = input.to_ascii_lowercase();
    let bytes = lower.as_bytes();

    if has_stacked_statement(&lower) {
        Some(InjectionKind::StackedQuery)
    } else if COMMENT_SEQUENCES.iter().any(|seq| lower.contains(seq)) {
        Some(InjectionKind::CommentSequence)
    } else if has_union_select(bytes) {
        Some(InjectionKind::UnionSelect)
    } else if has_tautology(bytes) {
        Some(InjectionKind::Tautology)
    } else {
        None
    }
}

/// A statement keyword anywhere after the first `;`, even inside a longer
/// word: `a; backdrop` is rejected along with `a; drop`.
fn has_stacked_statement(lower: &str) -> bool {
    let Some(pos) = lower.find(';') else {
        return false;
    };
    let tail = lower.get(pos + 1..).unwrap_or_default();
    STACKED_STATEMENT_KEYWORDS.iter().any(|kw| tail.contains(kw))
}

/// `union`, optionally `all`/`distinct`, then `select`.
fn has_union_select(bytes: &[u8]) -> bool {
    find_words(bytes, b"union").any(|end| {
        let mut cur = Cursor::new(bytes, end);
        cur.skip_separators();
        if !cur.eat_word(b"all") {
            let _ = cur.eat_word(b"distinct");
        }
        cur.skip_separators();
        cur.eat_word(b"select")
    })
}

/// An `OR` followed by an always-true comparison.
fn has_tautology(bytes: &[u8]) -> bool {
    find_words(bytes, b"or").any(|end| {
        let start = end.saturating_sub(2);
        let limit = end.saturating_add(TAUTOLOGY_LOOKAHEAD).min(bytes.len());
        let window = bytes.get(..limit).unwrap_or(bytes);
        is_true_literal(window, start, end) || is_self_comparison(window, end)
    })
}

/// `' OR TRUE`, `1 OR TRUE`, `) OR TRUE`.
///
/// A bare `or true` in prose is too common to reject, so the `OR` must follow
/// something that closes an operand.
fn is_true_literal(bytes: &[u8], or_start: usize, or_end: usize) -> bool {
    let closes_operand = bytes
        .get(..or_start)
        .and_then(|before| before.iter().rev().find(|b| !b.is_ascii_whitespace()))
        .is_some_and(|b| matches!(*b, b'\'' | b'"' | b')') || b.is_ascii_digit());

    let mut cur = Cursor::new(bytes, or_end);
    cur.skip_whitespace();
    closes_operand && cur.eat_word(b"true")
}

/// `<operand> (= | == | like) <operand>` with identical operands.
fn is_self_comparison(bytes: &[u8], or_end: usize) -> bool {
    let mut cur = Cursor::new(bytes, or_end);
    cur.skip_whitespace();
    let Some(lhs) = cur.operand(false) else {
        return false;
    };
    cur.skip_whitespace();
    if !(cur.eat(b"==") || cur.eat(b"=") || cur.eat_word(b"like")) {
        return false;
    }
    cur.skip_whitespace();
    // The closing quote of the right operand is usually supplied by the query
    // the payload was spliced into, so an unterminated literal still counts.
    cur.operand(true).is_some_and(|rhs| rhs == lhs)
}

/// End offsets of every whole-word occurrence of `word` in `bytes`.
fn find_words<'a>(bytes: &'a [u8], word: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    bytes
        .windows(word.len())
        .enumerate()
        .filter(move |(i, w)| {
            *w == word && is_word_start(bytes, *i) && is_word_end(bytes, i + word.len())
        })
        .map(move |(i, _)| i + word.len())
}

/// Forward-only scanner over lowercased input.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn rest(&self) -> &'a [u8] {
        self.bytes.get(self.pos..).unwrap_or_default()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Whitespace and opening parentheses.
    fn skip_separators(&mut self) {
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_whitespace() || b == b'(')
        {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &[u8]) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &[u8]) -> bool {
        let end = self.pos + word.len();
        if self.rest().starts_with(word) && is_word_end(self.bytes, end) {
            self.pos = end;
            true
        } else {
            false
        }
    }

    /// A quoted literal, number or identifier, returned without quotes.
    fn operand(&mut self, allow_unterminated: bool) -> Option<&'a [u8]> {
        let start = self.pos;
        match self.peek()? {
            quote @ (b'\'' | b'"') => {
                let body = start + 1;
                let rest = self.bytes.get(body..)?;
                match rest.iter().position(|b| *b == quote) {
                    Some(len) => {
                        self.pos = body + len + 1;
                        self.bytes.get(body..body + len)
                    },
                    None if allow_unterminated => {
                        self.pos = self.bytes.len();
                        Some(rest.trim_ascii_end())
                    },
                    None => None,
                }
            },
            b if is_ident_byte(b) => {
                while self.peek().is_some_and(|b| is_ident_byte(b) || b == b'.') {
                    self.pos += 1;
                }
                self.bytes.get(start..self.pos)
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(s: &str) -> Option<InjectionKind> {
        sql_threat(s)
    }

    #[test]
    fn test_benign_inputs() {
        for s in [
            "",
            "SELECT * FROM users",
            "Robert",
            "O'Brien",
            "rock and roll",
            "this or that",
            "I want to update my profile",
            "price: 10 - 2",
            "a; b",
            "unionized workers select a leader",
            "either 1 or 2 = 3",
        ] {
            assert_eq!(kind(s), None, "should be benign: {s:?}");
        }
    }

    #[test]
    fn test_stacked_statements() {
        for s in [
            "SELECT * FROM users; DROP TABLE users;",
            "1;drop table t",
            "x'; DELETE FROM accounts",
            "a;\n\tInSeRt INTO t VALUES (1)",
            "a; ALTER TABLE t ADD c int",
            "a; update t set x = 1",
            "a; please (truncate) everything",
            "'; EXEC xp_cmdshell 'dir'",
        ] {
            assert_eq!(kind(s), Some(InjectionKind::StackedQuery), "{s:?}");
        }
    }

    #[test]
    fn test_keyword_before_semicolon_is_not_stacked() {
        assert_eq!(kind("DROP it; later"), None);
    }

    #[test]
    fn test_keyword_inside_a_word_after_semicolon() {
        assert_eq!(kind("a; backdrop"), Some(InjectionKind::StackedQuery));
        assert_eq!(kind("a; dropped"), Some(InjectionKind::StackedQuery));
        assert_eq!(kind("a;reinsert"), Some(InjectionKind::StackedQuery));
        assert_eq!(kind("a; backstage"), None);
    }

    #[test]
    fn test_comment_sequences() {
        assert_eq!(kind("admin'--"), Some(InjectionKind::CommentSequence));
        assert_eq!(kind("admin' /* x"), Some(InjectionKind::CommentSequence));
        assert_eq!(kind("x */"), Some(InjectionKind::CommentSequence));
    }

    #[test]
    fn test_union_select() {
        assert_eq!(
            kind("1 UNION SELECT password FROM users"),
            Some(InjectionKind::UnionSelect)
        );
        assert_eq!(kind("1 union all select 1"), Some(InjectionKind::UnionSelect));
        assert_eq!(
            kind("1 union distinct select 1"),
            Some(InjectionKind::UnionSelect)
        );
        assert_eq!(kind("1 UNION (SELECT 1)"), Some(InjectionKind::UnionSelect));
        assert_eq!(kind("the union selected a rep"), None);
    }

    #[test]
    fn test_tautologies() {
        for s in [
            "' OR '1'='1",
            "' or '1'='1'",
            "x' OR 'a'='a",
            "1 OR 1=1",
            "1 or 1 = 1",
            "\" OR \"\"=\"",
            "' or ''='",
            "' OR 'x' LIKE 'x",
            "' OR TRUE",
            "1) or true",
            "' OR a=a",
            "'OR'1'='1",
        ] {
            assert_eq!(kind(s), Some(InjectionKind::Tautology), "{s:?}");
        }
    }

    #[test]
    fn test_non_tautologies() {
        assert_eq!(kind("' OR '1'='2"), None);
        assert_eq!(kind("to be or true love"), None);
        assert_eq!(kind("a or b"), None);
        assert_eq!(kind("coordinate = 1"), None);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(kind("1; DrOp TaBlE t"), Some(InjectionKind::StackedQuery));
        assert_eq!(kind("1 UnIoN sElEcT 2"), Some(InjectionKind::UnionSelect));
        assert_eq!(kind("' oR '1'='1"), Some(InjectionKind::Tautology));
    }

    #[test]
    fn test_non_ascii_input() {
        assert_eq!(kind("café; DROP TABLE t"), Some(InjectionKind::StackedQuery));
        assert_eq!(kind("名前 or 名前"), None);
    }
}
