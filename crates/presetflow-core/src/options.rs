//! Layered option tree.
//!
//! Merge semantics:
//! - Objects: deep-merge by key (recursive)
//! - Arrays: CONCATENATE (base elements, then overlay elements)
//! - Scalars: override (overlay wins)

use serde_json::{Map, Value};
use tracing::warn;

/// Deep merge two JSON values.
///
/// Arrays are never replaced and never merged element by element: the
/// overlay's elements are appended to the base's, duplicates included.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (Value::Array(mut base_items), Value::Array(overlay_items)) => {
            base_items.extend(overlay_items);
            Value::Array(base_items)
        }
        (_, overlay) => overlay,
    }
}

/// Loose truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy,
/// everything else (including empty arrays and objects) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The merged configuration tree held by a runtime context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    tree: Map<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `partial` into the tree. Later calls win for scalars and
    /// object keys; arrays accumulate.
    pub fn update(&mut self, partial: Value) {
        let partial = match partial {
            Value::Object(map) => map,
            other => {
                warn!("ignoring non-object options partial: {}", other);
                return;
            }
        };
        let base = Value::Object(std::mem::take(&mut self.tree));
        if let Value::Object(merged) = deep_merge(base, Value::Object(partial)) {
            self.tree = merged;
        }
    }

    /// Returns the stored value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.tree.get(name)
    }

    /// Returns the stored value for `name` with `default` as a fallback.
    ///
    /// A stored object is laid over `default` one level deep. Any other
    /// stored value is returned only when truthy, so `0`, `""` and `false`
    /// yield `default`.
    pub fn get_or(&self, name: &str, default: Value) -> Value {
        match self.tree.get(name) {
            Some(Value::Object(stored)) => {
                let mut combined = match default {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                for (key, value) in stored {
                    combined.insert(key.clone(), value.clone());
                }
                Value::Object(combined)
            }
            Some(stored) if is_truthy(stored) => stored.clone(),
            _ => default,
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.tree.clone())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.tree.keys()
    }
}
