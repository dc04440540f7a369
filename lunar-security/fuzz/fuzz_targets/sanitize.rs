#![no_main]

use libfuzzer_sys::fuzz_target;
use lunar_security::{needs_escaping, sanitize};

fuzz_target!(|data: &str| {
    let out = sanitize(data);

    assert!(out.len() <= data.len() * 2);
    assert_eq!(needs_escaping(data), out != data);
    for seq in ["--", "/*", "*/"] {
        assert!(!out.contains(seq), "{seq:?} survived in {out:?}");
    }

    // Every quote or terminator in the output sits behind an odd run of backslashes
    let mut backslashes = 0usize;
    for c in out.chars() {
        if matches!(c, '\'' | '"' | ';') {
            assert!(backslashes % 2 == 1, "unescaped {c:?} in {out:?}");
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
    }
});
