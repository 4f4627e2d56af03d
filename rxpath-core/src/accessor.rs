//! Deep read and copy-on-write over the value model
//!
//! Both functions are pure: they never touch a stream. `write` clones only
//! the containers on the path from the root to the leaf's parent; every
//! other subtree of the new root is the same allocation as in the old one.

use crate::error::AccessError;
use rxpath_types::{Path, Value};
use std::sync::Arc;

/// Value at `path` inside `root`
///
/// A nullish intermediate ends the walk and is returned itself.
pub fn read(root: &Value, path: &Path) -> Value {
    let mut current = root.clone();
    for key in path {
        if current.is_nullish() {
            break;
        }
        current = current.get(key);
    }
    current
}

/// New root with `value` stored at `path`
///
/// The empty path replaces the root. Objects take any non-symbol key.
/// Arrays take an index up to their length, where the length itself
/// appends.
pub fn write(root: &Value, path: &Path, value: Value) -> Result<Value, AccessError> {
    write_at(root, path, 0, value)
}

fn write_at(current: &Value, path: &Path, depth: usize, value: Value) -> Result<Value, AccessError> {
    let Some(key) = path.keys().get(depth) else {
        return Ok(value);
    };
    let here = || Path::from_keys(path.keys()[..depth].to_vec());

    match current {
        Value::Object(map) => {
            let field = key.as_field().ok_or_else(|| AccessError::InvalidKey {
                path: here(),
                key: key.clone(),
                container: "object",
            })?;
            let child = map.get(&field).cloned().unwrap_or_default();
            let updated = write_at(&child, path, depth + 1, value)?;

            let mut next = (**map).clone();
            next.insert(field, updated);
            Ok(Value::Object(Arc::new(next)))
        }
        Value::Array(items) => {
            let index = key.as_index().ok_or_else(|| AccessError::InvalidKey {
                path: here(),
                key: key.clone(),
                container: "array",
            })?;
            if index > items.len() {
                return Err(AccessError::IndexOutOfBounds {
                    path: here(),
                    index,
                    len: items.len(),
                });
            }
            let child = items.get(index).cloned().unwrap_or_default();
            let updated = write_at(&child, path, depth + 1, value)?;

            let mut next = (**items).clone();
            if index == next.len() {
                next.push(updated);
            } else {
                next[index] = updated;
            }
            Ok(Value::Array(Arc::new(next)))
        }
        Value::Absent | Value::Null => Err(AccessError::MissingIntermediate { path: here() }),
        other => Err(AccessError::NotAContainer {
            path: here(),
            type_name: other.type_name(),
        }),
    }
}
