//! Prepared statements with escaped positional parameters.
//!
//! A template such as `SELECT * FROM users WHERE name = ? AND org = ?` is
//! split at its `?` placeholders once, at construction. Values are bound in
//! call order and are only ever rendered as quoted, escaped literals, so a
//! bound value cannot change the statement's structure whatever it contains
//! and whether or not the caller sanitized it first.
//!
//! A `?` inside a quoted literal of the template (`'?'`, `"?"`) is text, not a
//! placeholder.
//!
//! Literals are written for one [`Dialect`]. The default is MySQL's backslash
//! escaping; statements for `SQLite` or Postgres need
//! [`with_dialect`](PreparedStatement::with_dialect) and [`Dialect::Ansi`].
//!
//! # Example
//!
//! ```
//! use lunar_security::{Dialect, PreparedStatement};
//!
//! let mut stmt = PreparedStatement::new("SELECT * FROM users WHERE name = ?");
//! stmt.bind("'; DROP TABLE users; --").unwrap();
//!
//! assert_eq!(
//!     stmt.finalize().unwrap(),
//!     r"SELECT * FROM users WHERE name = '\'\; DROP TABLE users\; \-\-'"
//! );
//!
//! let mut stmt = PreparedStatement::with_dialect("SELECT ?", Dialect::Ansi);
//! stmt.bind("O'Brien").unwrap();
//! assert_eq!(stmt.finalize().unwrap(), "SELECT 'O''Brien'");
//! ```

use crate::constants::PLACEHOLDER;
use crate::dialect::Dialect;
use std::fmt;
use std::ops::Range;
use tracing::debug;

/// Misuse of a [`PreparedStatement`].
///
/// These are programmer errors in the host, reported distinctly from routine
/// classifier rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatementError {
    /// More values bound than the template has placeholders.
    BindOverflow {
        /// Placeholders in the template.
        placeholders: usize,
    },
    /// Finalized before every placeholder had a value.
    IncompleteBinding {
        /// Placeholders in the template.
        placeholders: usize,
        /// Values bound so far.
        bound: usize,
    },
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindOverflow { placeholders } => {
                write!(
                    f,
                    "Cannot bind more than {placeholders} parameter(s) to this statement"
                )
            },
            Self::IncompleteBinding {
                placeholders,
                bound,
            } => {
                write!(
                    f,
                    "Statement has {placeholders} placeholder(s) but only {bound} bound"
                )
            },
        }
    }
}

impl std::error::Error for StatementError {}

/// A query template plus the values bound to its placeholders so far.
///
/// Not meant for concurrent mutation: binding order is the caller's to
/// sequence, which `&mut self` enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    template: String,
    /// Literal text around the placeholders; always `placeholders + 1` long.
    segments: Vec<Range<usize>>,
    params: Vec<String>,
    dialect: Dialect,
}

impl PreparedStatement {
    /// Parse `template` and count its placeholders, rendering values for
    /// MySQL.
    ///
    /// The template is trusted code, never user input. A template without
    /// placeholders is valid and finalizes to itself.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_dialect(template, Dialect::default())
    }

    /// Parse `template`, rendering values as literals of `dialect`.
    #[must_use]
    pub fn with_dialect(template: impl Into<String>, dialect: Dialect) -> Self {
        let template = template.into();
        let segments = split_placeholders(&template);
        Self {
            template,
            segments,
            params: Vec::new(),
            dialect,
        }
    }

    /// A new statement over the same template with nothing bound.
    #[must_use]
    pub fn unbound(&self) -> Self {
        Self {
            template: self.template.clone(),
            segments: self.segments.clone(),
            params: Vec::new(),
            dialect: self.dialect,
        }
    }

    /// The template this statement was created from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The dialect values are rendered for.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Number of placeholders in the template.
    pub fn placeholder_count(&self) -> usize {
        self.segments.len() - 1
    }

    /// Number of values bound so far.
    pub fn bound_count(&self) -> usize {
        self.params.len()
    }

    /// Whether every placeholder has a value.
    pub fn is_complete(&self) -> bool {
        self.bound_count() == self.placeholder_count()
    }

    /// Bind the next placeholder to `value`.
    ///
    /// The value is stored as given and escaped at [`finalize`](Self::finalize).
    ///
    /// # Errors
    ///
    /// [`StatementError::BindOverflow`] if every placeholder is already bound;
    /// the statement is left unchanged.
    pub fn bind(&mut self, value: impl Into<String>) -> Result<(), StatementError> {
        if self.is_complete() {
            debug!(
                placeholders = self.placeholder_count(),
                "bind past last placeholder"
            );
            return Err(StatementError::BindOverflow {
                placeholders: self.placeholder_count(),
            });
        }
        self.params.push(value.into());
        Ok(())
    }

    /// Bind several values in order.
    ///
    /// All or nothing: if the values would overflow the template, none of them
    /// are bound.
    ///
    /// # Example
    ///
    /// ```
    /// use lunar_security::PreparedStatement;
    ///
    /// let mut stmt = PreparedStatement::new("INSERT INTO t (a, b) VALUES (?, ?)");
    /// stmt.bind_all(["x", "y"]).unwrap();
    /// assert_eq!(stmt.finalize().unwrap(), "INSERT INTO t (a, b) VALUES ('x', 'y')");
    /// ```
    pub fn bind_all<I, S>(&mut self, values: I) -> Result<(), StatementError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if self.bound_count() + values.len() > self.placeholder_count() {
            debug!(
                placeholders = self.placeholder_count(),
                bound = self.bound_count(),
                attempted = values.len(),
                "bind_all past last placeholder"
            );
            return Err(StatementError::BindOverflow {
                placeholders: self.placeholder_count(),
            });
        }
        self.params.extend(values);
        Ok(())
    }

    /// Render the statement with every placeholder replaced, in order, by its
    /// value as a single-quoted literal of the statement's [`Dialect`].
    ///
    /// Once complete, the statement cannot take further values; build a new
    /// one (see [`unbound`](Self::unbound)) to run it with another set.
    ///
    /// # Errors
    ///
    /// [`StatementError::IncompleteBinding`] if a placeholder has no value. No
    /// partial query is ever produced.
    pub fn finalize(&self) -> Result<String, StatementError> {
        if !self.is_complete() {
            debug!(
                placeholders = self.placeholder_count(),
                bound = self.bound_count(),
                "finalize with unbound placeholders"
            );
            return Err(StatementError::IncompleteBinding {
                placeholders: self.placeholder_count(),
                bound: self.bound_count(),
            });
        }

        let params_len: usize = self.params.iter().map(|p| p.len() * 2 + 2).sum();
        let mut sql = String::with_capacity(self.template.len() + params_len);

        let mut segments = self.segments.iter();
        if let Some(first) = segments.next() {
            sql.push_str(self.segment(first));
        }
        for (param, segment) in self.params.iter().zip(segments) {
            self.dialect.push_literal(&mut sql, param);
            sql.push_str(self.segment(segment));
        }
        Ok(sql)
    }

    fn segment(&self, range: &Range<usize>) -> &str {
        self.template.get(range.clone()).unwrap_or_default()
    }
}

/// Byte ranges of the text between placeholders.
fn split_placeholders(template: &str) -> Vec<Range<usize>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (i, c) in template.char_indices() {
        match (quote, c) {
            // A doubled quote closes and reopens, which is what `''` means
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {},
            (None, '\'' | '"') => quote = Some(c),
            (None, PLACEHOLDER) => {
                segments.push(start..i);
                start = i + PLACEHOLDER.len_utf8();
            },
            (None, _) => {},
        }
    }
    segments.push(start..template.len());
    segments
}
