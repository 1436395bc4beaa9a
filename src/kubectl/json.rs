/// Defaulted field access on loosely-typed kubectl JSON
use serde_json::Value;
use tracing::debug;

/// Follow `path` through nested objects
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// String at `path`, or `default` when missing or not a string
pub fn str_at<'a>(value: &'a Value, path: &[&str], default: &'a str) -> &'a str {
    lookup(value, path).and_then(Value::as_str).unwrap_or(default)
}

/// Integer at `path`, or `default` when missing or not an integer
pub fn i64_at(value: &Value, path: &[&str], default: i64) -> i64 {
    lookup(value, path).and_then(Value::as_i64).unwrap_or(default)
}

/// Array at `path`, or an empty slice
pub fn array_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    lookup(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// True when the value at `path` is absent, null, or an empty object/array/string
pub fn is_empty_at(value: &Value, path: &[&str]) -> bool {
    match lookup(value, path) {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// `metadata.name` of a resource item
pub fn name(item: &Value) -> &str {
    str_at(item, &["metadata", "name"], "")
}

/// Find the status condition of the given type
pub fn condition<'a>(item: &'a Value, kind: &str) -> Option<&'a Value> {
    array_at(item, &["status", "conditions"])
        .iter()
        .find(|c| str_at(c, &["type"], "") == kind)
}

/// Decode a `kubectl get -o json` list into its items
///
/// Empty or malformed output and a missing `items` array all give an empty list.
pub fn parse_items(stdout: &str) -> Vec<Value> {
    if stdout.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(stdout) {
        Ok(Value::Object(mut list)) => match list.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!("Discarding malformed kubectl JSON: {}", e);
            Vec::new()
        }
    }
}
