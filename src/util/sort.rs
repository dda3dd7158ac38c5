use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Returns a copy of `value` with object keys sorted recursively.
pub fn sort_value_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .map(|(key, child)| (key, sort_value_keys(child)))
                .collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(key, child)| (key.clone(), child))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value_keys).collect()),
        _ => value.clone(),
    }
}

/// Serializes `value` with sorted keys, so equal documents yield equal text.
pub fn canonical_json(value: &Value) -> String {
    sort_value_keys(value).to_string()
}
