use serde::Serialize;
use serde_json::Value;

/// Serialize CLI overrides, dropping unset values so they don't mask lower layers
pub fn filter_unset<T: Serialize>(input: T) -> Value {
    let mut value = serde_json::to_value(input).unwrap_or(Value::Null);
    filter_unset_recursive(&mut value);
    value
}

fn filter_unset_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            // Recurse first so tables emptied by the filter are removed too
            for (_, v) in map.iter_mut() {
                filter_unset_recursive(v);
            }

            map.retain(|_, v| match v {
                Value::Null => false,
                Value::Object(inner) => !inner.is_empty(),
                _ => true,
            });
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                filter_unset_recursive(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nulls_and_empty_tables_removed() {
        let value = filter_unset(json!({
            "runner": { "jobs": 4, "checkpoint": null },
            "validator": { "timeout_secs": null },
            "scanner": { "extensions": ["mp4"] }
        }));

        assert_eq!(
            value,
            json!({
                "runner": { "jobs": 4 },
                "scanner": { "extensions": ["mp4"] }
            })
        );
    }
}
