//! Comparison semantics over JSON values
//!
//! Equality is lenient: numbers compare by value and mismatched types are simply
//! unequal. Ordering is strict: only numbers, strings, booleans and sequences of
//! those can be ordered, and anything else is an error.

use crate::error::{GuardError, Result};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Structural equality that treats `1` and `1.0` as the same number
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => number_cmp(a, b) == Some(Ordering::Equal),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| loose_eq(x, y)))
        }
        _ => left == right,
    }
}

/// Order `left` relative to `right`, failing when the kinds cannot be ordered
pub fn compare(op: &'static str, left: &Value, right: &Value) -> Result<Ordering> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => number_cmp(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                match compare(op, x, y)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => None,
    };

    ordering.ok_or_else(|| GuardError::Incomparable {
        op,
        left: kind_name(left).to_string(),
        right: kind_name(right).to_string(),
    })
}

/// Human readable name of a value's kind, used in error messages
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn number_cmp(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_equal_across_representations() {
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!([1, 2]), &json!([1.0, 2])));
        assert!(!loose_eq(&json!(1), &json!("1")));
    }

    #[test]
    fn test_objects_compare_keywise() {
        assert!(loose_eq(&json!({"a": 1, "b": [2]}), &json!({"b": [2.0], "a": 1})));
        assert!(!loose_eq(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(compare(">", &json!(5), &json!(3)).unwrap(), Ordering::Greater);
        assert_eq!(compare("<", &json!(-1), &json!(2.5)).unwrap(), Ordering::Less);
        assert_eq!(compare("<", &json!("abc"), &json!("abd")).unwrap(), Ordering::Less);
        assert_eq!(compare("<", &json!([1, 2]), &json!([1, 2, 0])).unwrap(), Ordering::Less);
        assert_eq!(compare("<", &json!(u64::MAX), &json!(u64::MAX)).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_incomparable_kinds() {
        let err = compare(">", &json!("5"), &json!(3)).unwrap_err();
        assert!(matches!(err, GuardError::Incomparable { op: ">", .. }));
        assert!(compare("<", &json!(null), &json!(null)).is_err());
        assert!(compare("<", &json!([1, "a"]), &json!([1, 2])).is_err());
    }
}
