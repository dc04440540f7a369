//! Crate-level error type.
//!
//! Each component reports its own error type; [`Error`] unifies them for
//! hosts that want a single `?`-friendly type across the whole crate.

use crate::classify::RejectedInput;
use crate::rate_limit::ConfigError;
use crate::statement::StatementError;
use std::fmt;

/// Any error produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Input matched an injection signature.
    RejectedInput(RejectedInput),
    /// Invalid rate limiter configuration.
    Config(ConfigError),
    /// Prepared statement misuse.
    Statement(StatementError),
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RejectedInput(e) => fmt::Display::fmt(e, f),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Statement(e) => write!(f, "Statement error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RejectedInput(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Statement(e) => Some(e),
        }
    }
}

impl From<RejectedInput> for Error {
    fn from(e: RejectedInput) -> Self {
        Self::RejectedInput(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StatementError> for Error {
    fn from(e: StatementError) -> Self {
        Self::Statement(e)
    }
}
