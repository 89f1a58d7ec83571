//! Structural equality over JSON values.
//!
//! Used for field-level diffing. Objects compare by key set regardless of
//! insertion order, arrays compare positionally, and numbers compare by
//! numeric value so `1` and `1.0` are the same field value.

use serde_json::{Map, Number, Value};

pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => objects_equal(xm, ym),
        _ => a == b,
    }
}

pub fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| values_equal(value, other)))
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_are_key_order_independent() {
        let a = json!({"a": 1, "b": {"c": [1, 2], "d": null}});
        let b = json!({"b": {"d": null, "c": [1, 2]}, "a": 1});
        assert!(values_equal(&a, &b));
    }

    #[test]
    fn arrays_are_order_sensitive() {
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!([1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn extra_or_missing_keys_differ() {
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!({"a": 1, "b": 2}), &json!({"a": 1, "c": 2})));
    }

    #[test]
    fn numbers_compare_numerically() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!values_equal(&json!(-1), &json!(1)));
        assert!(!values_equal(&json!(1.5), &json!(1)));
    }

    #[test]
    fn primitives_of_different_kinds_differ() {
        assert!(!values_equal(&json!("1"), &json!(1)));
        assert!(!values_equal(&json!(null), &json!(false)));
        assert!(!values_equal(&json!({}), &json!([])));
    }
}
