//! Path projection over a value stream

use rxpath_stream::{Observable, Operator};
use rxpath_types::{Path, Value};
use std::sync::Arc;

/// Value at `path` inside `root`, with callables bound to their container
///
/// A nullish intermediate is returned itself instead of failing, the same
/// way optional chaining stops at the first missing link.
pub fn pluck(root: &Value, path: &Path) -> Value {
    let Some((last, parents)) = path.keys().split_last() else {
        return root.clone();
    };

    let mut container = root.clone();
    for key in parents {
        if container.is_nullish() {
            return container;
        }
        container = container.get(key);
    }
    if container.is_nullish() {
        return container;
    }

    match container.get(last) {
        Value::Function(func) => Value::Function(func.bind(container)),
        leaf => leaf,
    }
}

/// Map every emission of `source` to the value at `path`
pub fn project(source: &Observable<Value>, path: &Path) -> Observable<Value> {
    if path.is_root() {
        return source.clone();
    }
    let path = path.clone();
    source.map(move |root| pluck(&root, &path))
}

/// [`project`] as a pipeline stage
pub fn deep_pluck(path: Path) -> Operator<Value> {
    Arc::new(move |source: Observable<Value>| project(&source, &path))
}
