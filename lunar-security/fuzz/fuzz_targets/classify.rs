#![no_main]

use libfuzzer_sys::fuzz_target;
use lunar_security::{classify, is_nosql_injection, is_sql_injection, is_valid};

fuzz_target!(|data: &str| {
    // Classification never panics and the entry points agree
    let verdict = classify(data);
    assert_eq!(verdict.is_accepted(), is_valid(data));
    assert_eq!(
        is_valid(data),
        !is_sql_injection(data) && !is_nosql_injection(data)
    );
});
