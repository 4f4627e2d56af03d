//! rxpath - Path projection over push streams
//!
//! This crate lets any nested field of the values emitted by a stream be
//! addressed as a stream of its own. It includes:
//!
//! - **Projection nodes**: navigate with [`Node::get`], invoke callable
//!   leaves with [`Node::call`], and compose operators with [`Node::pipe`]
//! - **Overrides**: per-kind interception of `value`, `next`, `error`,
//!   `complete`, iteration and introspection before generic projection
//! - **State**: copy-on-write writes through any path of a replaying root
//!
//! ## Example
//!
//! ```rust
//! use rxpath_core::statify;
//! use rxpath_stream::CollectingObserver;
//! use rxpath_types::Value;
//!
//! let state = statify(Value::object([("a", Value::object([("b", Value::from(1))]))]));
//! let b = state.get("a").get("b");
//!
//! let observer = CollectingObserver::new();
//! let sub = b.subscribe(observer.clone());
//! b.next(2).unwrap();
//!
//! assert_eq!(observer.values(), vec![Value::from(1), Value::from(2)]);
//! assert_eq!(b.value().unwrap(), Value::from(2));
//! sub.unsubscribe();
//! ```

pub mod accessor;
pub mod error;
pub mod node;
pub mod options;
pub mod overrides;
pub mod pluck;
pub mod source;
pub mod state;

pub use error::{AccessError, ProxyError, Result};
pub use node::{Access, Node, SourceKind};
pub use options::ProxyOptions;
pub use overrides::{
    Children, EventOverrides, Handler, Hint, Member, NoOverrides, Overrides, PropertyDescriptor,
    StateOverrides,
};
pub use pluck::deep_pluck;
pub use source::{proxify, proxify_with, statify, Source};
pub use state::StateContainer;
