//! Signature-based detection of SQL and document-store injection payloads.
//!
//! The classifier is a safety net, not a parser. It recognizes:
//! - Stacked statements: `;` followed later by `DROP`, `DELETE`, `INSERT`, ...
//! - Comment sequences used to truncate a query: `--`, `/*`, `*/`
//! - Boolean tautologies after `OR`: `' OR '1'='1`, `1 OR 1=1`, `' OR TRUE`
//! - `UNION [ALL] SELECT`
//! - Document-store operators: `$where`, `$ne`, `$gt`, ...
//!
//! Matching is case-insensitive. Novel payload shapes can slip through, and
//! ordinary prose containing these shapes is rejected. Route untrusted values
//! through a [`PreparedStatement`](crate::PreparedStatement) regardless of the
//! verdict.
//!
//! # Example
//!
//! ```
//! use lunar_security::{InjectionKind, Verdict, classify, is_valid};
//!
//! assert!(is_valid("SELECT * FROM users"));
//! assert!(!is_valid("SELECT * FROM users; DROP TABLE users;"));
//!
//! assert_eq!(
//!     classify("name: {$ne: null}"),
//!     Verdict::Rejected(InjectionKind::NoSqlOperator)
//! );
//! ```

mod nosql;
mod sql;

use std::fmt;
use tracing::{debug, warn};

pub use nosql::nosql_threat;
pub use sql::sql_threat;

/// The signature family that caused an input to be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InjectionKind {
    /// A `;` terminator followed by a second statement keyword.
    StackedQuery,
    /// A `--`, `/*` or `*/` comment sequence.
    CommentSequence,
    /// An always-true `OR` condition such as `'1'='1'`.
    Tautology,
    /// A `UNION SELECT` appending attacker-chosen rows.
    UnionSelect,
    /// A `$`-prefixed document-store operator such as `$ne` or `$where`.
    NoSqlOperator,
}

impl InjectionKind {
    /// Short stable name, suitable for log fields and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StackedQuery => "stacked_query",
            Self::CommentSequence => "comment_sequence",
            Self::Tautology => "tautology",
            Self::UnionSelect => "union_select",
            Self::NoSqlOperator => "nosql_operator",
        }
    }
}

impl fmt::Display for InjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one input.
///
/// There are no partial states: an input is accepted or rejected as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Verdict {
    /// No known injection signature was found.
    Accepted,
    /// At least one signature fired; the first one found is reported.
    Rejected(InjectionKind),
}

impl Verdict {
    /// Whether the input was accepted.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The signature that fired, if any.
    #[must_use]
    pub const fn kind(self) -> Option<InjectionKind> {
        match self {
            Self::Accepted => None,
            Self::Rejected(kind) => Some(kind),
        }
    }
}

impl From<Verdict> for bool {
    fn from(verdict: Verdict) -> Self {
        verdict.is_accepted()
    }
}

/// An input rejected by the classifier.
///
/// Rejection is a routine negative result. This type exists so callers that
/// prefer `?` can use [`ensure_valid`] instead of branching on a `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedInput {
    /// The signature that fired.
    pub kind: InjectionKind,
}

impl fmt::Display for RejectedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input rejected: {} signature detected", self.kind)
    }
}

impl std::error::Error for RejectedInput {}

/// Classify `input`, reporting which signature fired.
///
/// SQL signatures are checked before document-store ones. Empty input is
/// accepted.
#[must_use]
pub fn classify(input: &str) -> Verdict {
    match sql_threat(input).or_else(|| nosql_threat(input)) {
        Some(kind) => {
            warn!(kind = %kind, len = input.len(), "injection signature detected");
            Verdict::Rejected(kind)
        },
        None => Verdict::Accepted,
    }
}

/// Whether `input` is free of every known injection signature.
///
/// Returns `false` if either [`is_sql_injection`] or [`is_nosql_injection`]
/// would return `true`.
#[inline]
#[must_use]
pub fn is_valid(input: &str) -> bool {
    classify(input).is_accepted()
}

/// Whether `input` matches a SQL injection signature.
#[must_use]
pub fn is_sql_injection(input: &str) -> bool {
    let found = sql_threat(input);
    if let Some(kind) = found {
        debug!(kind = %kind, "sql injection signature");
    }
    found.is_some()
}

/// Whether `input` contains a document-store operator payload.
#[must_use]
pub fn is_nosql_injection(input: &str) -> bool {
    let found = nosql_threat(input);
    if let Some(kind) = found {
        debug!(kind = %kind, "nosql injection signature");
    }
    found.is_some()
}

/// Reject `input` with an error if any signature fires.
///
/// # Example
///
/// ```
/// use lunar_security::{InjectionKind, ensure_valid};
///
/// assert!(ensure_valid("Alice").is_ok());
/// let err = ensure_valid("x' OR '1'='1").unwrap_err();
/// assert_eq!(err.kind, InjectionKind::Tautology);
/// ```
pub fn ensure_valid(input: &str) -> Result<(), RejectedInput> {
    match classify(input) {
        Verdict::Accepted => Ok(()),
        Verdict::Rejected(kind) => Err(RejectedInput { kind }),
    }
}

/// Bytes that can continue an identifier or keyword.
#[inline]
const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether position `i` of `s` begins a word.
#[inline]
fn is_word_start(s: &[u8], i: usize) -> bool {
    i.checked_sub(1)
        .and_then(|prev| s.get(prev))
        .is_none_or(|b| !is_ident_byte(*b))
}

/// Whether position `i` of `s` ends a word.
#[inline]
fn is_word_end(s: &[u8], i: usize) -> bool {
    s.get(i).is_none_or(|b| !is_ident_byte(*b))
}
