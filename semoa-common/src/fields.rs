//! Optional-field access on decoded JSON records
//!
//! Records are never validated against a schema. Every accessor here treats a
//! missing key, an explicit `null` and a value of the wrong shape the same way:
//! as absent, falling back to the declared default.

use crate::ids::normalize_id;
use serde_json::Value;

/// Follow a chain of object keys; `None` if any hop is missing or null
pub fn path<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut current = record;
    for key in keys {
        current = current.get(key)?;
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// String field, empty when absent
///
/// Scalars of other types are rendered with their JSON text so that a numeric
/// field in an unexpected place still lands in the table.
pub fn text(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Non-empty string field
pub fn opt_text(record: &Value, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Integer field, `None` when absent or not numeric
pub fn opt_int(record: &Value, key: &str) -> Option<i64> {
    let value = record.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

/// Counter field (`works_count`, `cited_by_count`, ...), zero when absent
pub fn count(record: &Value, key: &str) -> i64 {
    opt_int(record, key).unwrap_or(0)
}

/// Floating-point field, zero when absent
pub fn float(record: &Value, key: &str) -> f64 {
    record.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Array field, empty when absent or not an array
pub fn array<'a>(record: &'a Value, key: &str) -> &'a [Value] {
    match record.get(key) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// Array of strings, skipping non-string entries
pub fn string_list(record: &Value, key: &str) -> Vec<String> {
    array(record, key)
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Normalized identifier stored under `id`, `None` when absent or empty
pub fn id_of(record: &Value) -> Option<String> {
    record.get("id").and_then(reference)
}

/// Normalize a JSON reference value, `None` unless it is a non-empty string
pub fn reference(value: &Value) -> Option<String> {
    let id = normalize_id(value.as_str()?);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
