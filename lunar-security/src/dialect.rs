//! String literal quoting for MySQL and standard SQL.
//!
//! Databases disagree on what a backslash inside `'...'` means, so the same
//! escaped value cannot be safe everywhere:
//!
//! | Value     | [`Dialect::MySql`] | [`Dialect::Ansi`] |
//! |-----------|--------------------|-------------------|
//! | `O'Brien` | `'O\'Brien'`       | `'O''Brien'`      |
//! | `a\b`     | `'a\\b'`           | `'a\b'`           |
//! | `1; --`   | `'1\; \-\-'`       | `'1; --'`         |
//!
//! Rendering for the wrong database either fails to parse or stores a
//! different value than was bound.

use crate::sanitize::escape_into;
use std::fmt;

/// How a bound value is written as a quoted literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Dialect {
    /// MySQL and MariaDB: the backslash table of [`sanitize`](crate::sanitize).
    #[default]
    MySql,
    /// Standard SQL, as spoken by `SQLite` and by Postgres with
    /// `standard_conforming_strings`: a quote is doubled and nothing else
    /// changes.
    ///
    /// These databases reject NUL inside a literal, so a value containing one
    /// makes the statement fail to run rather than truncate.
    Ansi,
}

impl Dialect {
    /// Lowercase name, as accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Ansi => "ansi",
        }
    }

    /// Append `value` to `out` as a complete quoted literal.
    pub(crate) fn push_literal(self, out: &mut String, value: &str) {
        out.push('\'');
        match self {
            Self::MySql => escape_into(out, value),
            Self::Ansi => {
                for c in value.chars() {
                    if c == '\'' {
                        out.push('\'');
                    }
                    out.push(c);
                }
            },
        }
        out.push('\'');
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
