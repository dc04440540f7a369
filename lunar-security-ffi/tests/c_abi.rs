//! Exercises the C ABI the way a C caller would: raw pointers, explicit frees.

#![allow(unsafe_code)]

use lunar_security_ffi::{
    LunarDialect, LunarStatus, lunar_is_nosql_injection, lunar_is_sql_injection, lunar_rate_limiter_check,
    lunar_rate_limiter_free, lunar_rate_limiter_new, lunar_sanitize, lunar_statement_bind,
    lunar_statement_finalize, lunar_statement_free, lunar_statement_new,
    lunar_statement_new_with_dialect, lunar_string_free, validate_input,
};
use std::ffi::{CStr, CString, c_char};
use std::ptr;

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

/// Copy a library-owned string and free it.
unsafe fn take(s: *mut c_char) -> String {
    assert!(!s.is_null());
    let owned = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_owned();
    unsafe { lunar_string_free(s) };
    owned
}

// =============================================================================
// Classifier and Sanitizer
// =============================================================================

#[test]
fn test_validate_input() {
    unsafe {
        assert!(validate_input(c("SELECT * FROM users").as_ptr()));
        assert!(!validate_input(
            c("SELECT * FROM users; DROP TABLE users;").as_ptr()
        ));
        assert!(validate_input(c("").as_ptr()));
    }
}

#[test]
fn test_null_and_invalid_utf8_are_not_valid() {
    let bad = CString::new(vec![b'a', 0xc3, 0x28]).unwrap();
    unsafe {
        assert!(!validate_input(ptr::null()));
        assert!(!validate_input(bad.as_ptr()));
        assert!(lunar_is_sql_injection(ptr::null()));
        assert!(lunar_is_nosql_injection(bad.as_ptr()));
        assert!(lunar_sanitize(ptr::null()).is_null());
    }
}

#[test]
fn test_detectors() {
    unsafe {
        assert!(lunar_is_sql_injection(c("' OR '1'='1").as_ptr()));
        assert!(!lunar_is_sql_injection(c("{\"$gt\": 0}").as_ptr()));
        assert!(lunar_is_nosql_injection(c("{\"$gt\": 0}").as_ptr()));
        assert!(!lunar_is_nosql_injection(c("price: $5").as_ptr()));
    }
}

#[test]
fn test_sanitize_round_trip() {
    unsafe {
        let out = take(lunar_sanitize(c("O'Brien; --").as_ptr()));
        assert_eq!(out, r"O\'Brien\; \-\-");
        lunar_string_free(ptr::null_mut());
    }
}

// =============================================================================
// Rate Limiter
// =============================================================================

#[test]
fn test_rate_limiter_lifecycle() {
    let key = c("10.0.0.1");
    let other = c("10.0.0.2");
    unsafe {
        let limiter = lunar_rate_limiter_new(2, 60_000);
        assert!(!limiter.is_null());

        assert!(lunar_rate_limiter_check(limiter, key.as_ptr()));
        assert!(lunar_rate_limiter_check(limiter, key.as_ptr()));
        assert!(!lunar_rate_limiter_check(limiter, key.as_ptr()));
        assert!(lunar_rate_limiter_check(limiter, other.as_ptr()));

        assert!(!lunar_rate_limiter_check(limiter, ptr::null()));
        lunar_rate_limiter_free(limiter);
    }
}

#[test]
fn test_rate_limiter_counts_non_utf8_keys() {
    let latin1 = CString::new(vec![b'J', 0xf6, b'r', b'g']).unwrap();
    let other = CString::new(vec![0xff, 0xfe]).unwrap();
    unsafe {
        let limiter = lunar_rate_limiter_new(1, 60_000);
        assert!(lunar_rate_limiter_check(limiter, latin1.as_ptr()));
        assert!(!lunar_rate_limiter_check(limiter, latin1.as_ptr()));
        // A different undecodable key has its own counter
        assert!(lunar_rate_limiter_check(limiter, other.as_ptr()));
        assert!(!lunar_rate_limiter_check(limiter, other.as_ptr()));
        lunar_rate_limiter_free(limiter);
    }
}

#[test]
fn test_rate_limiter_rejects_zero_config() {
    assert!(lunar_rate_limiter_new(0, 1000).is_null());
    assert!(lunar_rate_limiter_new(10, 0).is_null());
    unsafe {
        assert!(!lunar_rate_limiter_check(ptr::null(), c("k").as_ptr()));
        lunar_rate_limiter_free(ptr::null_mut());
    }
}

// =============================================================================
// Prepared Statement
// =============================================================================

#[test]
fn test_statement_lifecycle() {
    unsafe {
        let stmt = lunar_statement_new(c("SELECT * FROM users WHERE name = ? AND age > ?").as_ptr());
        assert!(!stmt.is_null());

        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(
            lunar_statement_bind(stmt, c("'; DROP TABLE users; --").as_ptr()),
            LunarStatus::Ok
        );
        assert_eq!(
            lunar_statement_finalize(stmt, &mut out),
            LunarStatus::IncompleteBinding
        );
        assert!(out.is_null());

        assert_eq!(lunar_statement_bind(stmt, c("30").as_ptr()), LunarStatus::Ok);
        assert_eq!(
            lunar_statement_bind(stmt, c("31").as_ptr()),
            LunarStatus::BindOverflow
        );

        assert_eq!(lunar_statement_finalize(stmt, &mut out), LunarStatus::Ok);
        assert_eq!(
            take(out),
            r"SELECT * FROM users WHERE name = '\'\; DROP TABLE users\; \-\-' AND age > '30'"
        );

        lunar_statement_free(stmt);
    }
}

#[test]
fn test_statement_ansi_dialect() {
    unsafe {
        let stmt = lunar_statement_new_with_dialect(
            c("SELECT * FROM users WHERE name = ?").as_ptr(),
            LunarDialect::Ansi,
        );
        assert!(!stmt.is_null());
        assert_eq!(lunar_statement_bind(stmt, c(r"O'Brien\").as_ptr()), LunarStatus::Ok);

        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(lunar_statement_finalize(stmt, &mut out), LunarStatus::Ok);
        assert_eq!(take(out), r"SELECT * FROM users WHERE name = 'O''Brien\'");

        lunar_statement_free(stmt);
        assert!(lunar_statement_new_with_dialect(ptr::null(), LunarDialect::Mysql).is_null());
    }
}

#[test]
fn test_statement_null_arguments() {
    unsafe {
        assert!(lunar_statement_new(ptr::null()).is_null());
        assert_eq!(
            lunar_statement_bind(ptr::null_mut(), c("x").as_ptr()),
            LunarStatus::NullPointer
        );

        let stmt = lunar_statement_new(c("SELECT ?").as_ptr());
        assert_eq!(lunar_statement_bind(stmt, ptr::null()), LunarStatus::NullPointer);
        assert_eq!(
            lunar_statement_finalize(stmt, ptr::null_mut()),
            LunarStatus::NullPointer
        );

        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(
            lunar_statement_finalize(ptr::null(), &mut out),
            LunarStatus::NullPointer
        );
        assert!(out.is_null());

        lunar_statement_free(stmt);
        lunar_statement_free(ptr::null_mut());
    }
}

#[test]
fn test_statement_invalid_utf8_value() {
    let bad = CString::new(vec![0xff]).unwrap();
    unsafe {
        let stmt = lunar_statement_new(c("SELECT ?").as_ptr());
        assert_eq!(lunar_statement_bind(stmt, bad.as_ptr()), LunarStatus::InvalidUtf8);
        lunar_statement_free(stmt);
    }
}
