//! C ABI for `lunar-security`.
//!
//! `build.rs` regenerates `include/lunar_security.h` from this file with
//! cbindgen on every build.
//!
//! Ownership rules:
//!
//! - Limiters and statements are heap handles. The caller owns the pointer
//!   from `_new` until the matching `_free`.
//! - Strings returned by `lunar_sanitize` and `lunar_statement_finalize` are
//!   owned by the caller and must be released with `lunar_string_free`.
//! - Null pointers and invalid UTF-8 never cause undefined behaviour: the
//!   classifier reports them as not valid and the other calls return null or
//!   an error status.
#![allow(unsafe_code)]

use lunar_security::{Dialect, PreparedStatement, RateLimiter, StatementError};
use std::ffi::{CStr, CString, c_char};
use std::ptr;
use std::time::Duration;

/// Opaque rate limiter handle.
#[derive(Debug)]
pub struct LunarRateLimiter(RateLimiter);

/// Opaque prepared statement handle.
#[derive(Debug)]
pub struct LunarStatement(PreparedStatement);

/// Literal syntax a statement is rendered for.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)] // mirrored by a C enum
pub enum LunarDialect {
    /// MySQL and MariaDB backslash escaping.
    Mysql = 0,
    /// Standard SQL quote doubling, for SQLite and Postgres.
    Ansi = 1,
}

impl From<LunarDialect> for Dialect {
    fn from(dialect: LunarDialect) -> Self {
        match dialect {
            LunarDialect::Mysql => Self::MySql,
            LunarDialect::Ansi => Self::Ansi,
        }
    }
}

/// Result of statement calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)] // mirrored by a C enum
pub enum LunarStatus {
    /// Success.
    Ok = 0,
    /// A required pointer argument was null.
    NullPointer = 1,
    /// A string argument was not valid UTF-8.
    InvalidUtf8 = 2,
    /// Every placeholder was already bound.
    BindOverflow = 3,
    /// Some placeholders are still unbound.
    IncompleteBinding = 4,
}

impl From<StatementError> for LunarStatus {
    fn from(e: StatementError) -> Self {
        match e {
            StatementError::BindOverflow { .. } => Self::BindOverflow,
            // Non-exhaustive upstream; any other misuse is an incomplete statement
            _ => Self::IncompleteBinding,
        }
    }
}

/// Borrow a C string as `&str`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// and unmodified for `'a`.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> Result<&'a str, LunarStatus> {
    if ptr.is_null() {
        return Err(LunarStatus::NullPointer);
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract
    let c_str = unsafe { CStr::from_ptr(ptr) };
    c_str.to_str().map_err(|_| LunarStatus::InvalidUtf8)
}

/// Hand a Rust string to C. Interior NULs cannot occur in escaped output, but
/// are reported as null rather than truncated.
fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).map_or(ptr::null_mut(), CString::into_raw)
}

// =============================================================================
// Classifier and Sanitizer
// =============================================================================

/// Returns `true` when `input` carries no injection signature.
///
/// # Safety
///
/// `input` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn validate_input(input: *const c_char) -> bool {
    // SAFETY: forwarded caller contract
    unsafe { borrow_str(input) }.is_ok_and(lunar_security::is_valid)
}

/// Returns `true` when `input` matches a SQL injection signature, or is null
/// or not UTF-8.
///
/// # Safety
///
/// `input` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_is_sql_injection(input: *const c_char) -> bool {
    // SAFETY: forwarded caller contract
    match unsafe { borrow_str(input) } {
        Ok(s) => lunar_security::is_sql_injection(s),
        Err(_) => true,
    }
}

/// Returns `true` when `input` matches a document-store operator signature,
/// or is null or not UTF-8.
///
/// # Safety
///
/// `input` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_is_nosql_injection(input: *const c_char) -> bool {
    // SAFETY: forwarded caller contract
    match unsafe { borrow_str(input) } {
        Ok(s) => lunar_security::is_nosql_injection(s),
        Err(_) => true,
    }
}

/// Escaped copy of `input`, or null if `input` is null or not UTF-8.
///
/// # Safety
///
/// `input` must be null or a valid NUL-terminated string. The result must be
/// released with [`lunar_string_free`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_sanitize(input: *const c_char) -> *mut c_char {
    // SAFETY: forwarded caller contract
    match unsafe { borrow_str(input) } {
        Ok(s) => into_c_string(lunar_security::sanitize(s)),
        Err(_) => ptr::null_mut(),
    }
}

/// Release a string returned by this library. Null is ignored.
///
/// # Safety
///
/// `s` must be null or a pointer obtained from this library that has not
/// been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_string_free(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    // SAFETY: produced by CString::into_raw and not yet freed
    drop(unsafe { CString::from_raw(s) });
}

// =============================================================================
// Rate Limiter
// =============================================================================

/// Create a limiter admitting `max_requests` per key per `window_ms`.
///
/// Returns null when either value is zero.
#[unsafe(no_mangle)]
pub extern "C" fn lunar_rate_limiter_new(max_requests: u32, window_ms: u64) -> *mut LunarRateLimiter {
    match RateLimiter::new(max_requests, Duration::from_millis(window_ms)) {
        Ok(limiter) => Box::into_raw(Box::new(LunarRateLimiter(limiter))),
        Err(e) => {
            tracing::debug!(error = %e, "rejected rate limiter configuration");
            ptr::null_mut()
        },
    }
}

/// Record a request for `key`. Returns `true` if it is admitted.
///
/// Keys are compared as raw bytes, so they need not be UTF-8. A null limiter
/// or a null key is rejected.
///
/// # Safety
///
/// `limiter` must be null or a live handle from [`lunar_rate_limiter_new`].
/// `key` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_rate_limiter_check(
    limiter: *const LunarRateLimiter,
    key: *const c_char,
) -> bool {
    // SAFETY: null or a live handle per the caller's contract
    let Some(limiter) = (unsafe { limiter.as_ref() }) else {
        return false;
    };
    if key.is_null() {
        return false;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract
    let key = unsafe { CStr::from_ptr(key) };
    limiter.0.check_bytes(key.to_bytes())
}

/// Destroy a limiter. Null is ignored.
///
/// # Safety
///
/// `limiter` must be null or a handle from [`lunar_rate_limiter_new`] that
/// has not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_rate_limiter_free(limiter: *mut LunarRateLimiter) {
    if limiter.is_null() {
        return;
    }
    // SAFETY: produced by Box::into_raw and not yet freed
    drop(unsafe { Box::from_raw(limiter) });
}

// =============================================================================
// Prepared Statement
// =============================================================================

/// Parse `query_template` into a statement rendering MySQL literals. Returns
/// null if `query_template` is null or not UTF-8.
///
/// # Safety
///
/// `query_template` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_statement_new(query_template: *const c_char) -> *mut LunarStatement {
    // SAFETY: forwarded caller contract
    unsafe { lunar_statement_new_with_dialect(query_template, LunarDialect::Mysql) }
}

/// Parse `query_template` into a statement rendering literals for `dialect`.
/// Returns null if `query_template` is null or not UTF-8.
///
/// # Safety
///
/// `query_template` must be null or a valid NUL-terminated string. `dialect`
/// must be one of the declared enumerators.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_statement_new_with_dialect(
    query_template: *const c_char,
    dialect: LunarDialect,
) -> *mut LunarStatement {
    // SAFETY: forwarded caller contract
    match unsafe { borrow_str(query_template) } {
        Ok(template) => Box::into_raw(Box::new(LunarStatement(
            PreparedStatement::with_dialect(template, dialect.into()),
        ))),
        Err(_) => ptr::null_mut(),
    }
}

/// Bind the next parameter value.
///
/// # Safety
///
/// `stmt` must be null or a live statement handle not used concurrently
/// from another thread. `value` must be null or a valid NUL-terminated
/// string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_statement_bind(
    stmt: *mut LunarStatement,
    value: *const c_char,
) -> LunarStatus {
    // SAFETY: null or a live, exclusively used handle per the caller's contract
    let Some(stmt) = (unsafe { stmt.as_mut() }) else {
        return LunarStatus::NullPointer;
    };
    // SAFETY: forwarded caller contract
    let value = match unsafe { borrow_str(value) } {
        Ok(value) => value,
        Err(status) => return status,
    };
    match stmt.0.bind(value) {
        Ok(()) => LunarStatus::Ok,
        Err(e) => e.into(),
    }
}

/// Render the finalized query into `*out`.
///
/// On success `*out` receives a string to release with
/// [`lunar_string_free`]. On failure `*out` is set to null.
///
/// # Safety
///
/// `stmt` must be null or a live statement handle. `out` must be null or
/// valid for a pointer write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_statement_finalize(
    stmt: *const LunarStatement,
    out: *mut *mut c_char,
) -> LunarStatus {
    if out.is_null() {
        return LunarStatus::NullPointer;
    }
    // SAFETY: checked non-null, writable per the caller's contract
    unsafe { out.write(ptr::null_mut()) };

    // SAFETY: null or a live handle per the caller's contract
    let Some(stmt) = (unsafe { stmt.as_ref() }) else {
        return LunarStatus::NullPointer;
    };
    match stmt.0.finalize() {
        Ok(sql) => {
            // SAFETY: as above
            unsafe { out.write(into_c_string(sql)) };
            LunarStatus::Ok
        },
        Err(e) => e.into(),
    }
}

/// Destroy a statement. Null is ignored.
///
/// # Safety
///
/// `stmt` must be null or a statement handle that has not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lunar_statement_free(stmt: *mut LunarStatement) {
    if stmt.is_null() {
        return;
    }
    // SAFETY: produced by Box::into_raw and not yet freed
    drop(unsafe { Box::from_raw(stmt) });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrow_str() {
        let s = CString::new("abc").unwrap();
        assert_eq!(unsafe { borrow_str(s.as_ptr()) }, Ok("abc"));
        assert_eq!(
            unsafe { borrow_str(ptr::null()) },
            Err(LunarStatus::NullPointer)
        );

        let bad = CString::new(vec![0xff, 0xfe]).unwrap();
        assert_eq!(
            unsafe { borrow_str(bad.as_ptr()) },
            Err(LunarStatus::InvalidUtf8)
        );
    }

    #[test]
    fn test_dialect_mapping() {
        assert_eq!(Dialect::from(LunarDialect::Mysql), Dialect::MySql);
        assert_eq!(Dialect::from(LunarDialect::Ansi), Dialect::Ansi);
    }

    #[test]
    fn test_status_from_statement_error() {
        assert_eq!(
            LunarStatus::from(StatementError::BindOverflow { placeholders: 1 }),
            LunarStatus::BindOverflow
        );
        assert_eq!(
            LunarStatus::from(StatementError::IncompleteBinding {
                placeholders: 2,
                bound: 1
            }),
            LunarStatus::IncompleteBinding
        );
    }
}
