//! Structural subset matching of JSON values
//!
//! Objects match when every expected key is present in the actual object with
//! a matching value. Arrays match when every expected element can be paired
//! with a distinct actual element, in any order.

use serde_json::{Map, Value};

/// Check that `expected` is a structural subset of `actual`
///
/// On mismatch, returns a description prefixed with the JSON path where the
/// first difference was found.
pub fn match_subset(expected: &Value, actual: &Value, path: &str) -> Result<(), String> {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => match_objects(e, a, path),
        (Value::Array(e), Value::Array(a)) => match_arrays(e, a, path),
        (Value::Number(e), Value::Number(a)) => {
            if numbers_equal(e, a) {
                Ok(())
            } else {
                Err(format!("{}: wanted {}, got {}", path, e, a))
            }
        }
        (Value::String(e), Value::String(a)) if e == a => Ok(()),
        (Value::Bool(e), Value::Bool(a)) if e == a => Ok(()),
        (Value::Null, Value::Null) => Ok(()),
        _ if type_name(expected) != type_name(actual) => Err(format!(
            "{}: wanted {}, got {}",
            path,
            type_name(expected),
            type_name(actual)
        )),
        _ => Err(format!("{}: wanted {}, got {}", path, expected, actual)),
    }
}

fn match_objects(expected: &Map<String, Value>, actual: &Map<String, Value>, path: &str) -> Result<(), String> {
    for (key, value) in expected {
        let child = format!("{}.{}", path, key);
        match actual.get(key) {
            Some(found) => match_subset(value, found, &child)?,
            None => return Err(format!("{}: missing", child)),
        }
    }
    Ok(())
}

fn match_arrays(expected: &[Value], actual: &[Value], path: &str) -> Result<(), String> {
    if expected.len() > actual.len() {
        return Err(format!(
            "{}: wanted at least {} elements, got {}",
            path,
            expected.len(),
            actual.len()
        ));
    }

    // candidates[i] lists the actual elements expected[i] could pair with
    let candidates: Vec<Vec<usize>> = expected
        .iter()
        .map(|e| {
            actual
                .iter()
                .enumerate()
                .filter(|(_, a)| match_subset(e, a, path).is_ok())
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    let mut owner: Vec<Option<usize>> = vec![None; actual.len()];
    for (i, element) in expected.iter().enumerate() {
        let mut seen = vec![false; actual.len()];
        if !assign(i, &candidates, &mut seen, &mut owner) {
            return Err(format!("{}[{}]: no matching element for {}", path, i, element));
        }
    }
    Ok(())
}

/// Augmenting-path step of bipartite matching
fn assign(
    expected: usize,
    candidates: &[Vec<usize>],
    seen: &mut [bool],
    owner: &mut [Option<usize>],
) -> bool {
    for &slot in &candidates[expected] {
        if seen[slot] {
            continue;
        }
        seen[slot] = true;
        let free = match owner[slot] {
            None => true,
            Some(other) => assign(other, candidates, seen, owner),
        };
        if free {
            owner[slot] = Some(expected);
            return true;
        }
    }
    false
}

fn numbers_equal(e: &serde_json::Number, a: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (e.as_i64(), a.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (e.as_u64(), a.as_u64()) {
        return x == y;
    }
    e.as_f64() == a.as_f64()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(expected: Value, actual: Value) -> Result<(), String> {
        match_subset(&expected, &actual, "$")
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        assert!(check(json!({"id": "10"}), json!({"id": "10", "extra": "x"})).is_ok());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let err = check(json!({"id": "10", "name": "a"}), json!({"id": "10"})).unwrap_err();
        assert_eq!(err, "$.name: missing");
    }

    #[test]
    fn test_nested_difference_names_the_path() {
        let err = check(
            json!({"user": {"address": {"city": "paris"}}}),
            json!({"user": {"address": {"city": "lyon"}}}),
        )
        .unwrap_err();
        assert!(err.starts_with("$.user.address.city:"), "{}", err);
    }

    #[test]
    fn test_type_mismatch() {
        let err = check(json!({"id": 10}), json!({"id": "10"})).unwrap_err();
        assert_eq!(err, "$.id: wanted number, got string");
        assert!(check(json!({"a": null}), json!({"a": null})).is_ok());
        assert!(check(json!({"a": null}), json!({"a": 0})).is_err());
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(check(json!({"n": 1}), json!({"n": 1.0})).is_ok());
        assert!(check(json!({"n": 1}), json!({"n": 2})).is_err());
    }

    #[test]
    fn test_arrays_ignore_order_and_extras() {
        assert!(check(json!([1, 2]), json!([2, 1, 3])).is_ok());
        assert!(check(json!([]), json!([1])).is_ok());
    }

    #[test]
    fn test_arrays_are_multisets() {
        assert!(check(json!([1, 2, 2]), json!([1, 2])).is_err());
        assert!(check(json!([1, 2, 2]), json!([2, 1, 2])).is_ok());
        assert!(check(json!([1, 4]), json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_array_matching_is_not_greedy() {
        // a greedy pass would pair {"a":1} with the first element and then
        // fail to place {"a":1,"b":2}
        assert!(check(
            json!([{"a": 1}, {"a": 1, "b": 2}]),
            json!([{"a": 1, "b": 2}, {"a": 1}])
        )
        .is_ok());
    }

    #[test]
    fn test_arrays_inside_objects() {
        assert!(check(
            json!({"items": [{"id": 2}]}),
            json!({"items": [{"id": 1, "x": 0}, {"id": 2, "x": 1}], "total": 2})
        )
        .is_ok());
        let err = check(json!({"items": [{"id": 3}]}), json!({"items": [{"id": 1}]})).unwrap_err();
        assert!(err.starts_with("$.items[0]"), "{}", err);
    }
}
