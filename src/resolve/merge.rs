//! Structural JSON merge.

use serde_json::Value;

/// Merge `incoming` into `base`.
///
/// Objects union their keys and merge colliding values recursively, arrays
/// are concatenated (no deduplication) and anything else is replaced by the
/// incoming value.
pub fn merge_json(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(incoming)) => base.extend(incoming),
        (base, incoming) => *base = incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn merged(a: Value, b: Value) -> Value {
        let mut a = a;
        merge_json(&mut a, b);
        a
    }

    #[test]
    fn test_disjoint_keys_union() {
        assert_eq!(merged(json!({"a": 1}), json!({"b": 2})), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_later_value_wins() {
        assert_eq!(merged(json!({"a": 1}), json!({"a": 2})), json!({"a": 2}));
    }

    #[test]
    fn test_nested_objects_recurse() {
        let out = merged(
            json!({"texture_data": {"a": {"textures": "a"}}, "resource_pack_name": "vanilla"}),
            json!({"texture_data": {"b": {"textures": "b"}}}),
        );
        assert_eq!(
            out,
            json!({
                "texture_data": {"a": {"textures": "a"}, "b": {"textures": "b"}},
                "resource_pack_name": "vanilla"
            })
        );
    }

    #[test]
    fn test_arrays_concatenate_without_dedup() {
        assert_eq!(
            merged(json!({"langs": ["en_US", "de_DE"]}), json!({"langs": ["en_US"]})),
            json!({"langs": ["en_US", "de_DE", "en_US"]})
        );
    }

    #[test]
    fn test_type_mismatch_replaces() {
        assert_eq!(merged(json!({"a": [1]}), json!({"a": {"b": 1}})), json!({"a": {"b": 1}}));
        assert_eq!(merged(json!([1]), json!("x")), json!("x"));
    }

    #[test]
    fn test_key_order_preserved() {
        let out = merged(json!({"z": 1, "a": 1}), json!({"m": 1, "z": 2}));
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
