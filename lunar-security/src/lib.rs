//! # lunar-security
//!
//! Defensive primitives for hosts that accept untrusted text and issue
//! database queries:
//!
//! - [`classify`] / [`is_valid`] - reject input carrying SQL or document-store
//!   injection signatures
//! - [`sanitize`] - escape query metacharacters for literal embedding
//! - [`RateLimiter`] - per-identity fixed-window request throttling
//! - [`PreparedStatement`] - templates whose bound values are always escaped
//!   literals, never syntax, written for MySQL or standard SQL ([`Dialect`])
//!
//! The crate classifies, counts and builds strings. It never opens a socket or
//! talks to a database; executing the finalized query is the host's job.
//!
//! ## Typical request path
//!
//! ```
//! use lunar_security::{PreparedStatement, RateLimiter, is_valid};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(100, Duration::from_secs(60)).unwrap();
//!
//! fn handle(limiter: &RateLimiter, client: &str, name: &str) -> Option<String> {
//!     if !limiter.check(client) || !is_valid(name) {
//!         return None;
//!     }
//!     let mut stmt = PreparedStatement::new("SELECT * FROM users WHERE name = ?");
//!     stmt.bind(name).ok()?;
//!     stmt.finalize().ok()
//! }
//!
//! assert_eq!(
//!     handle(&limiter, "10.0.0.1", "alice").as_deref(),
//!     Some("SELECT * FROM users WHERE name = 'alice'")
//! );
//! assert_eq!(handle(&limiter, "10.0.0.1", "x'; DROP TABLE users; --"), None);
//! ```
//!
//! ## Logging
//!
//! Detections are emitted as `tracing` events (`warn` for rejected input,
//! `debug` for throttled keys and statement misuse). Install any subscriber
//! to see them; without one they cost nothing.

pub mod classify;
pub mod constants;
pub mod dialect;
pub mod error;
pub mod rate_limit;
pub mod sanitize;
pub mod statement;

pub use classify::{
    InjectionKind, RejectedInput, Verdict, classify, ensure_valid, is_nosql_injection,
    is_sql_injection, is_valid, nosql_threat, sql_threat,
};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use rate_limit::{
    ConfigError, RateLimitConfig, RateLimitStatus, RateLimiter, RateLimiterBuilder,
};
pub use sanitize::{needs_escaping, sanitize};
pub use statement::{PreparedStatement, StatementError};
