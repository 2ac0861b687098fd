//! # Merge-Patch and Key Paths
//!
//! Document helpers shared by the store and the frozen view.

use serde_json::{Map, Value};

use crate::error::ParamError;
use crate::NODE_PLACEHOLDER;

/// Apply `patch` to `target` following RFC 7386.
///
/// - objects merge key by key, recursively
/// - `null` in the patch removes the key
/// - any other value replaces whatever was there
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target_map) = target else {
        return;
    };

    for (key, value) in patch_map {
        if value.is_null() {
            target_map.remove(key);
        } else {
            merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
        }
    }
}

/// Rewrite a leading `~` in `key` into `node`.
///
/// `"~/rate"` becomes `"<node>/rate"` and `"~"` alone becomes `"<node>"`.
/// Keys without the placeholder are returned unchanged.
#[must_use]
pub fn namespaced(key: &str, node: &str) -> String {
    match key.strip_prefix(NODE_PLACEHOLDER) {
        Some("") => node.to_string(),
        Some(rest) if rest.starts_with('/') => format!("{node}{rest}"),
        _ => key.to_string(),
    }
}

/// Split a `/`-separated key into its segments.
pub(crate) fn segments(key: &str) -> Result<Vec<&str>, ParamError> {
    let trimmed = key.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ParamError::InvalidKey {
            key: key.to_string(),
        });
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ParamError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(parts)
}

/// Look up the value at a `/`-separated key.
pub(crate) fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let parts = segments(key).ok()?;
    parts
        .into_iter()
        .try_fold(root, |node, part| node.as_object()?.get(part))
}

/// Write `value` at a `/`-separated key, creating intermediate objects.
pub(crate) fn set_path(root: &mut Value, key: &str, value: Value) -> Result<(), ParamError> {
    let parts = segments(key)?;
    let invalid = || ParamError::InvalidKey {
        key: key.to_string(),
    };

    if root.is_null() {
        *root = Value::Object(Map::new());
    }

    let (last, parents) = parts.split_last().ok_or_else(invalid)?;
    let mut node = root;
    for part in parents {
        let map = node.as_object_mut().ok_or_else(invalid)?;
        node = map
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    node.as_object_mut()
        .ok_or_else(invalid)?
        .insert((*last).to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_nested() {
        let mut doc = json!({"a": 1, "b": {"c": 2}});
        merge_patch(&mut doc, &json!({"b": {"c": 3, "d": 4}}));
        assert_eq!(doc, json!({"a": 1, "b": {"c": 3, "d": 4}}));
    }

    #[test]
    fn test_merge_patch_null_removes() {
        let mut doc = json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge_patch(&mut doc, &json!({"a": null, "b": {"c": null}}));
        assert_eq!(doc, json!({"b": {"d": 3}}));
    }

    #[test]
    fn test_merge_patch_scalar_overwrites_object() {
        let mut doc = json!({"a": {"deep": true}});
        merge_patch(&mut doc, &json!({"a": [1, 2]}));
        assert_eq!(doc, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_merge_patch_object_over_scalar() {
        let mut doc = json!({"a": 5});
        merge_patch(&mut doc, &json!({"a": {"b": 1}}));
        assert_eq!(doc, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_namespaced() {
        assert_eq!(namespaced("~/rate", "talker"), "talker/rate");
        assert_eq!(namespaced("~", "talker"), "talker");
        assert_eq!(namespaced("global/rate", "talker"), "global/rate");
        assert_eq!(namespaced("~other", "talker"), "~other");
    }

    #[test]
    fn test_set_and_lookup_path() {
        let mut doc = Value::Null;
        set_path(&mut doc, "a/b/c", json!(1)).unwrap();
        set_path(&mut doc, "/a/d", json!("x")).unwrap();

        assert_eq!(doc, json!({"a": {"b": {"c": 1}, "d": "x"}}));
        assert_eq!(lookup(&doc, "a/b/c"), Some(&json!(1)));
        assert_eq!(lookup(&doc, "a/missing"), None);
    }

    #[test]
    fn test_set_path_through_scalar_fails() {
        let mut doc = json!({"a": 1});
        assert!(matches!(
            set_path(&mut doc, "a/b", json!(2)),
            Err(ParamError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_invalid_keys() {
        assert!(segments("").is_err());
        assert!(segments("/").is_err());
        assert!(segments("a//b").is_err());
    }
}
