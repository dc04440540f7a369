#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lunar_security::{Dialect, PreparedStatement};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    template: String,
    values: Vec<String>,
    ansi: bool,
}

fuzz_target!(|input: FuzzInput| {
    let dialect = if input.ansi { Dialect::Ansi } else { Dialect::MySql };
    let mut stmt = PreparedStatement::with_dialect(input.template, dialect);
    let placeholders = stmt.placeholder_count();

    for value in input.values {
        let before = stmt.bound_count();
        match stmt.bind(value) {
            Ok(()) => assert_eq!(stmt.bound_count(), before + 1),
            Err(_) => assert_eq!(before, placeholders),
        }
    }

    // Finalizing succeeds exactly when every placeholder is bound
    assert_eq!(stmt.finalize().is_ok(), stmt.is_complete());
});
