//! Root constructors

use crate::error::{ProxyError, Result};
use crate::node::Node;
use crate::options::ProxyOptions;
use rxpath_stream::{BehaviorSubject, Observable, Subject};
use rxpath_types::Value;
use std::any::Any;

/// A root of one of the three supported kinds
#[derive(Debug, Clone)]
pub enum Source {
    Stream(Observable<Value>),
    Events(Subject<Value>),
    State(BehaviorSubject<Value>),
}

impl Source {
    pub fn into_node(self, options: ProxyOptions) -> Node {
        match self {
            Source::Stream(source) => Node::stream_source(source, options),
            Source::Events(subject) => Node::event_source(subject, options),
            Source::State(subject) => Node::state_source(subject, options),
        }
    }
}

impl From<Observable<Value>> for Source {
    fn from(source: Observable<Value>) -> Self {
        Source::Stream(source)
    }
}

impl From<Subject<Value>> for Source {
    fn from(subject: Subject<Value>) -> Self {
        Source::Events(subject)
    }
}

impl From<BehaviorSubject<Value>> for Source {
    fn from(subject: BehaviorSubject<Value>) -> Self {
        Source::State(subject)
    }
}

/// Build the node matching the kind of `source`
///
/// Accepts an `Observable<Value>`, a `Subject<Value>`, a
/// `BehaviorSubject<Value>` or a [`Source`]. Anything else fails with
/// [`ProxyError::InvalidSource`].
pub fn proxify<S: Any>(source: S) -> Result<Node> {
    proxify_with(source, ProxyOptions::default())
}

pub fn proxify_with<S: Any>(source: S, options: ProxyOptions) -> Result<Node> {
    detect(source)
        .map(|source| source.into_node(options))
        .ok_or(ProxyError::InvalidSource {
            type_name: std::any::type_name::<S>(),
        })
}

fn detect<S: Any>(source: S) -> Option<Source> {
    let boxed: Box<dyn Any> = Box::new(source);
    let boxed = match boxed.downcast::<Source>() {
        Ok(source) => return Some(*source),
        Err(other) => other,
    };
    let boxed = match boxed.downcast::<BehaviorSubject<Value>>() {
        Ok(subject) => return Some(Source::State(*subject)),
        Err(other) => other,
    };
    let boxed = match boxed.downcast::<Subject<Value>>() {
        Ok(subject) => return Some(Source::Events(*subject)),
        Err(other) => other,
    };
    boxed
        .downcast::<Observable<Value>>()
        .ok()
        .map(|source| Source::Stream(*source))
}

/// Distinct state node over a new replaying root holding `initial`
pub fn statify(initial: impl Into<Value>) -> Node {
    Node::state_source(BehaviorSubject::new(initial.into()), ProxyOptions::distinct())
}
