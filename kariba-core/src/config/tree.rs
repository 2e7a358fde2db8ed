//! Overlay merge and dotted-key access on the untyped configuration tree

use serde_json::{Map, Value};

use crate::error::{KaribaError, Result};

/// Overlays `user` onto `defaults`.
///
/// Top-level keys of `user` replace the default value, except when both sides
/// are mappings: then the default mapping is updated entry by entry. Anything
/// nested deeper than that is replaced wholesale.
pub fn overlay(defaults: Value, user: Value) -> Value {
    let Value::Object(user) = user else {
        return defaults;
    };
    let mut merged = match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (key, value) in user {
        match (merged.get_mut(&key), value) {
            (Some(Value::Object(section)), Value::Object(entries)) => {
                for (entry_key, entry_value) in entries {
                    section.insert(entry_key, entry_value);
                }
            }
            (_, value) => {
                merged.insert(key, value);
            }
        }
    }

    Value::Object(merged)
}

/// Walks `key` (`section.subsection.field`) one segment at a time.
///
/// Returns `None` as soon as the current value is not a mapping or the next
/// segment is not one of its keys.
pub fn lookup<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(tree, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

/// Writes `value` at `key`, creating intermediate mappings as needed.
///
/// Fails when an intermediate segment exists but is not a mapping.
pub fn assign(tree: &mut Value, key: &str, value: Value) -> Result<()> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(KaribaError::InvalidInput(format!(
            "Invalid configuration key '{}'",
            key
        )));
    }

    let segments: Vec<&str> = key.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| KaribaError::InvalidInput(key.to_string()))?;

    let mut current = tree;
    for segment in parents {
        let map = current.as_object_mut().ok_or_else(|| {
            KaribaError::Config(format!("'{}' does not address a mapping", key))
        })?;
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let map = current
        .as_object_mut()
        .ok_or_else(|| KaribaError::Config(format!("'{}' does not address a mapping", key)))?;
    map.insert(last.to_string(), value);
    Ok(())
}
