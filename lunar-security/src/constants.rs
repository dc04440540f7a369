//! Centralized constants for the lunar-security crate.
//!
//! All limits, sizes, and signature tables are defined here for easy tuning
//! and consistent behavior across the classifier, sanitizer and limiter.

// ============================================================================
// CLASSIFIER SIGNATURES
// ============================================================================

/// Keywords that start a second statement after a `;` terminator.
pub const STACKED_STATEMENT_KEYWORDS: &[&str] = &[
    "drop", "delete", "insert", "update", "alter", "create", "truncate", "exec", "execute",
    "grant", "revoke", "shutdown", "merge",
];

/// Comment sequences used to truncate the remainder of a query.
pub const COMMENT_SEQUENCES: &[&str] = &["--", "/*", "*/"];

/// Document-store query operators (matched after a `$`, case-insensitively).
pub const NOSQL_OPERATORS: &[&str] = &[
    "where",
    "ne",
    "eq",
    "gt",
    "gte",
    "lt",
    "lte",
    "in",
    "nin",
    "or",
    "and",
    "not",
    "nor",
    "regex",
    "exists",
    "expr",
    "elemmatch",
    "function",
    "accumulator",
    "type",
    "size",
    "all",
    "mod",
    "text",
    "jsonschema",
];

/// How many bytes after an `OR` keyword are inspected for a tautology.
///
/// Payloads like `' OR '1'='1` are short; a bounded lookahead keeps the scan
/// linear in the input length.
pub const TAUTOLOGY_LOOKAHEAD: usize = 64;

// ============================================================================
// RATE LIMITER
// ============================================================================

/// Checks between two sweeps of idle counters.
///
/// Must be a power of two so the wrapping check counter keeps the cadence.
pub const SWEEP_INTERVAL: u32 = 1024;

/// Windows a counter may stay idle before a sweep evicts it.
pub const EVICT_AFTER_WINDOWS: u32 = 3;

// ============================================================================
// SANITIZER
// ============================================================================

/// Upper bound on `sanitize(s).len() / s.len()`.
///
/// Every escaped character gains exactly one backslash.
pub const MAX_ESCAPE_GROWTH: usize = 2;

// ============================================================================
// PREPARED STATEMENTS
// ============================================================================

/// Placeholder character in statement templates.
pub const PLACEHOLDER: char = '?';
