//! Lenient parsers for values read back from the string store.
//!
//! Each helper takes the raw stored string (or `None` when absent) and a
//! default, and never fails.

use serde_json::{Map, Value};

/// Parse a leading decimal integer the way a browser's `parseInt(s, 10)` does
/// and return its magnitude.
///
/// Leading whitespace and a single sign are accepted, and parsing stops at the
/// first non-digit. When no digit is found the default is returned. A parsed
/// negative number is returned as its absolute value.
pub fn parse_non_neg_int_or(raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    let s = raw.trim_start();
    let s = s
        .strip_prefix('-')
        .or_else(|| s.strip_prefix('+'))
        .unwrap_or(s);
    let digits: &str = {
        let end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..end]
    };
    if digits.is_empty() {
        return default;
    }
    digits.bytes().fold(0u64, |acc, b| {
        acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
    })
}

/// `"yes"` and `"true"` parse as `true`; anything else yields the default.
pub fn parse_bool_or(raw: Option<&str>, default: bool) -> bool {
    matches!(raw, Some("yes") | Some("true")) || default
}

/// Parse a JSON object. The raw string must begin with `{`; parse failures
/// yield the default.
pub fn parse_json_obj_or(
    raw: Option<&str>,
    default: Option<Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match raw {
        Some(s) if s.starts_with('{') => serde_json::from_str(s).ok().or(default),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn int_basic() {
        assert_eq!(parse_non_neg_int_or(Some("15"), 10), 15);
        assert_eq!(parse_non_neg_int_or(Some("  7px"), 10), 7);
        assert_eq!(parse_non_neg_int_or(Some("-3"), 10), 3);
        assert_eq!(parse_non_neg_int_or(Some("+4"), 10), 4);
        assert_eq!(parse_non_neg_int_or(Some("abc"), 10), 10);
        assert_eq!(parse_non_neg_int_or(Some(""), 10), 10);
        assert_eq!(parse_non_neg_int_or(Some("-"), 10), 10);
        assert_eq!(parse_non_neg_int_or(None, 5), 5);
        assert_eq!(parse_non_neg_int_or(Some("3.9"), 5), 3);
    }

    #[test]
    fn bool_basic() {
        assert!(parse_bool_or(Some("yes"), false));
        assert!(parse_bool_or(Some("true"), false));
        assert!(!parse_bool_or(Some("false"), false));
        assert!(!parse_bool_or(Some("1"), false));
        assert!(!parse_bool_or(None, false));
        assert!(parse_bool_or(Some("no"), true));
    }

    #[test]
    fn json_requires_leading_brace() {
        assert_eq!(parse_json_obj_or(Some(" {\"a\":1}"), None), None);
        assert_eq!(parse_json_obj_or(Some("[1]"), None), None);
        assert_eq!(parse_json_obj_or(Some("{broken"), None), None);
        let parsed = parse_json_obj_or(Some("{\"a\":1}"), None).unwrap();
        assert_eq!(Value::Object(parsed), json!({"a": 1}));
    }

    fn json_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ]
    }

    fn json_object() -> impl Strategy<Value = Map<String, Value>> {
        let value = json_leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        });
        proptest::collection::btree_map("[a-z_]{1,8}", value, 0..6)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn non_numeric_yields_default(s in "[a-zA-Z_.]{0,10}", d in any::<u64>()) {
            prop_assert_eq!(parse_non_neg_int_or(Some(&s), d), d);
        }

        #[test]
        fn parsed_ints_are_absolute(n in any::<i32>(), tail in "[a-z]{0,4}") {
            let raw = format!("{n}{tail}");
            prop_assert_eq!(parse_non_neg_int_or(Some(&raw), 99), u64::from(n.unsigned_abs()));
        }

        #[test]
        fn json_object_round_trips(obj in json_object()) {
            let raw = serde_json::to_string(&obj).unwrap();
            prop_assert_eq!(parse_json_obj_or(Some(&raw), None), Some(obj));
        }
    }
}
