//! Document-store operator injection signatures.

use super::{InjectionKind, is_ident_byte};
use crate::constants::NOSQL_OPERATORS;

/// Find a `$`-prefixed query operator in `input`.
///
/// Catches operator smuggling in JSON bodies (`{"password": {"$ne": null}}`),
/// bracketed form fields (`password[$ne]=x`) and `$where` JavaScript. The
/// operator name must end at a non-identifier character, so `$100` and
/// `$gtfo` pass.
///
/// # Examples
///
/// ```
/// use lunar_security::{InjectionKind, nosql_threat};
///
/// assert_eq!(nosql_threat("price: $100"), None);
/// assert_eq!(nosql_threat(r#"{"$gt": ""}"#), Some(InjectionKind::NoSqlOperator));
/// assert_eq!(nosql_threat("user[$ne]=admin"), Some(InjectionKind::NoSqlOperator));
/// ```
#[must_use]
pub fn nosql_threat(input: &str) -> Option<InjectionKind> {
    let bytes = input.as_bytes();
    let found = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'$')
        .any(|(i, _)| {
            let name_start = i + 1;
            let name = bytes.get(name_start..).unwrap_or_default();
            let len = name.iter().take_while(|b| is_ident_byte(**b)).count();
            name.get(..len).is_some_and(is_operator)
        });
    found.then_some(InjectionKind::NoSqlOperator)
}

fn is_operator(name: &[u8]) -> bool {
    NOSQL_OPERATORS
        .iter()
        .any(|op| op.as_bytes().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_inputs() {
        for s in [
            "",
            "name: 'John'",
            "costs $100",
            "$",
            "$$",
            "cash$",
            "$gtfo",
            "$whereabouts unknown",
            "US$ 5",
        ] {
            assert_eq!(nosql_threat(s), None, "should be benign: {s:?}");
        }
    }

    #[test]
    fn test_operator_payloads() {
        for s in [
            "name: {$ne: null}",
            r#"{"username": "admin", "password": {"$ne": ""}}"#,
            r#"{"$where": "sleep(5000)"}"#,
            "password[$ne]=1",
            "age[$gt]=0",
            "{$or: [{}, {a: 1}]}",
            "{$regex: '.*'}",
            "$in",
            "{\"tags\": {\"$elemMatch\": {}}}",
        ] {
            assert_eq!(
                nosql_threat(s),
                Some(InjectionKind::NoSqlOperator),
                "{s:?}"
            );
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(nosql_threat("{$NE: 1}"), Some(InjectionKind::NoSqlOperator));
        assert_eq!(nosql_threat("$Where"), Some(InjectionKind::NoSqlOperator));
    }

    #[test]
    fn test_every_listed_operator_fires() {
        for op in NOSQL_OPERATORS {
            let payload = format!("{{\"${op}\": 1}}");
            assert_eq!(
                nosql_threat(&payload),
                Some(InjectionKind::NoSqlOperator),
                "{payload}"
            );
        }
    }
}
