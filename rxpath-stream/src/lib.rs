//! Synchronous push-stream runtime
//!
//! This crate provides the stream primitives consumed by rxpath:
//!
//! - **Observables**: cold producers run once per subscription
//! - **Subjects**: hot multicast sources, with a replaying [`BehaviorSubject`]
//! - **Operators**: `map`, `filter`, `scan`, `take`, `distinct_until_changed`
//! - **Subscriptions**: explicitly released handles with chained teardown
//!
//! All propagation is synchronous. Pushing into a subject delivers to every
//! reachable observer before the push returns, and no internal lock is held
//! while an observer runs, so observers may push again re-entrantly.
//!
//! ## Example
//!
//! ```rust
//! use rxpath_stream::{BehaviorSubject, CollectingObserver};
//!
//! let state = BehaviorSubject::new(1);
//! let observer = CollectingObserver::new();
//! let sub = state.as_observable().map(|v| v * 2).subscribe(observer.clone());
//!
//! state.next(2);
//! assert_eq!(observer.values(), vec![2, 4]);
//! sub.unsubscribe();
//! ```

pub mod error;
pub mod observable;
pub mod observer;
pub mod operators;
pub mod subject;
pub mod subscription;

pub use error::StreamError;
pub use observable::{empty, from_iter, never, of, throw, Observable, Operator};
pub use observer::{CollectingObserver, Notification, Observer, Subscriber};
pub use subject::{BehaviorSubject, Subject};
pub use subscription::Subscription;
