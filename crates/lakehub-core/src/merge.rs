//! Deep merge for JSON documents.
//!
//! Status updates on remote documents are always a merge onto the last-read
//! snapshot, never a blind overwrite, so concurrent unrelated fields survive.
//! Overlay wins on scalar conflicts, nested objects merge recursively, and
//! arrays of objects can be merged element-wise when a merge key is
//! configured for their field name.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Per-field merge keys for arrays of objects.
///
/// Key: the field name (e.g. `"files"`), value: the element field whose value
/// identifies an element across both sides (e.g. `"name"`). Arrays without a
/// configured rule are replaced wholesale by the overlay.
pub type MergeRules = HashMap<String, String>;

/// Merge `overlay` onto `base`, returning the merged map.
pub fn merge_values(
    base: &Map<String, Value>,
    overlay: &Map<String, Value>,
    rules: &MergeRules,
) -> Map<String, Value> {
    let mut result = base.clone();

    for (key, over) in overlay {
        match (result.get(key), over) {
            (Some(Value::Object(b)), Value::Object(o)) => {
                result.insert(key.clone(), Value::Object(merge_values(b, o, rules)));
            }
            (Some(Value::Array(b)), Value::Array(o)) => {
                let merged = match rules.get(key) {
                    Some(merge_key) if all_objects(b) && all_objects(o) => {
                        Value::Array(merge_keyed_arrays(b, o, merge_key, rules))
                    }
                    _ => over.clone(),
                };
                result.insert(key.clone(), merged);
            }
            _ => {
                result.insert(key.clone(), over.clone());
            }
        }
    }

    result
}

/// Merge two arrays of objects, aligning elements by the value of `merge_key`.
///
/// Same-key elements merge recursively; elements unique to either side are
/// preserved. Elements without the key are kept as-is from their side.
/// Result order is unspecified.
fn merge_keyed_arrays(
    base: &[Value],
    overlay: &[Value],
    merge_key: &str,
    rules: &MergeRules,
) -> Vec<Value> {
    let mut index: Vec<(Value, Map<String, Value>)> = Vec::new();
    let mut keyless: Vec<Value> = Vec::new();

    for item in base {
        if let Value::Object(m) = item {
            match m.get(merge_key) {
                Some(id) => index.push((id.clone(), m.clone())),
                None => keyless.push(item.clone()),
            }
        }
    }

    for item in overlay {
        if let Value::Object(m) = item {
            match m.get(merge_key) {
                Some(id) => {
                    if let Some(entry) = index.iter_mut().find(|(k, _)| k == id) {
                        entry.1 = merge_values(&entry.1, m, rules);
                    } else {
                        index.push((id.clone(), m.clone()));
                    }
                }
                None => keyless.push(item.clone()),
            }
        }
    }

    index
        .into_iter()
        .map(|(_, m)| Value::Object(m))
        .chain(keyless)
        .collect()
}

fn all_objects(arr: &[Value]) -> bool {
    arr.iter().all(|v| v.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_with_empty_overlay_is_identity() {
        let base = as_map(json!({
            "state": "CREATED",
            "nested": {"a": 1, "b": [1, 2]},
        }));
        let merged = merge_values(&base, &Map::new(), &MergeRules::new());
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_with_self_is_identity() {
        let base = as_map(json!({
            "state": "READY",
            "files": [{"name": "a", "size": 1}],
            "nested": {"x": true},
        }));
        let merged = merge_values(&base, &base, &MergeRules::new());
        assert_eq!(merged, base);
    }

    #[test]
    fn overlay_wins_on_scalars_and_recurses_on_objects() {
        let base = as_map(json!({"state": "CREATED", "meta": {"a": 1, "b": 2}}));
        let overlay = as_map(json!({"state": "UPLOADING", "meta": {"b": 3}}));
        let merged = merge_values(&base, &overlay, &MergeRules::new());
        assert_eq!(merged["state"], "UPLOADING");
        assert_eq!(merged["meta"]["a"], 1);
        assert_eq!(merged["meta"]["b"], 3);
    }

    #[test]
    fn arrays_without_rule_are_replaced() {
        let base = as_map(json!({"tags": [1, 2, 3]}));
        let overlay = as_map(json!({"tags": [9]}));
        let merged = merge_values(&base, &overlay, &MergeRules::new());
        assert_eq!(merged["tags"], json!([9]));
    }

    #[test]
    fn keyed_array_merge_aligns_by_key() {
        let base = as_map(json!({"files": [{"name": "a", "v": 1}, {"name": "b", "v": 2}]}));
        let overlay = as_map(json!({"files": [{"name": "b", "v": 3}, {"name": "c", "v": 4}]}));
        let rules = MergeRules::from([("files".to_string(), "name".to_string())]);

        let merged = merge_values(&base, &overlay, &rules);
        let files = merged["files"].as_array().unwrap();
        assert_eq!(files.len(), 3);

        let by_name = |n: &str| {
            files
                .iter()
                .find(|f| f["name"] == n)
                .unwrap_or_else(|| panic!("missing {n}"))
        };
        assert_eq!(by_name("a")["v"], 1);
        assert_eq!(by_name("b")["v"], 3);
        assert_eq!(by_name("c")["v"], 4);
    }

    #[test]
    fn mixed_array_types_fall_back_to_replace() {
        let base = as_map(json!({"files": [{"name": "a"}]}));
        let overlay = as_map(json!({"files": ["plain"]}));
        let rules = MergeRules::from([("files".to_string(), "name".to_string())]);
        let merged = merge_values(&base, &overlay, &rules);
        assert_eq!(merged["files"], json!(["plain"]));
    }
}
