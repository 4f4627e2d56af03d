//! Override dispatch
//!
//! Before a member access builds a child node, the node's resolver is asked
//! whether the member is intercepted at the node's path. A resolver answers
//! with a ready [`Handler`] or declines, in which case the access falls
//! through to generic projection.

use crate::error::Result;
use crate::node::Node;
use crate::state::StateContainer;
use rxpath_stream::{StreamError, Subject};
use rxpath_types::{Key, Symbol, Value};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Members that a resolver may intercept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    Value,
    GetValue,
    Next,
    Error,
    Complete,
    ToPrimitive,
    Iterate,
    ToJson,
    OwnKeys,
    PropertyDescriptor,
}

impl Member {
    /// Member named by `key`, if any
    pub fn from_key(key: &Key) -> Option<Member> {
        match key {
            Key::Field(name) => match name.as_str() {
                "value" => Some(Member::Value),
                "getValue" => Some(Member::GetValue),
                "next" => Some(Member::Next),
                "error" => Some(Member::Error),
                "complete" => Some(Member::Complete),
                "toJSON" => Some(Member::ToJson),
                _ => None,
            },
            Key::Symbol(sym) => match *sym {
                Symbol::ITERATOR => Some(Member::Iterate),
                Symbol::TO_PRIMITIVE => Some(Member::ToPrimitive),
                Symbol::OWN_KEYS => Some(Member::OwnKeys),
                Symbol::PROPERTY_DESCRIPTOR => Some(Member::PropertyDescriptor),
                _ => None,
            },
            Key::Index(_) => None,
        }
    }

    pub fn key(&self) -> Key {
        match self {
            Member::Value => Key::field("value"),
            Member::GetValue => Key::field("getValue"),
            Member::Next => Key::field("next"),
            Member::Error => Key::field("error"),
            Member::Complete => Key::field("complete"),
            Member::ToJson => Key::field("toJSON"),
            Member::Iterate => Key::Symbol(Symbol::ITERATOR),
            Member::ToPrimitive => Key::Symbol(Symbol::TO_PRIMITIVE),
            Member::OwnKeys => Key::Symbol(Symbol::OWN_KEYS),
            Member::PropertyDescriptor => Key::Symbol(Symbol::PROPERTY_DESCRIPTOR),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Context a primitive is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hint {
    #[default]
    Default,
    Number,
    String,
}

/// Own-property description of a value, as introspection reports it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    pub value: Value,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// Plain data property
    pub fn data(value: Value) -> Self {
        Self {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Descriptor of `key` on `owner`, when `owner` has such an own property
    pub fn of(owner: &Value, key: &Key) -> Option<Self> {
        match owner {
            Value::Object(map) => key
                .as_field()
                .and_then(|name| map.get(&name).cloned())
                .map(Self::data),
            Value::Array(items) => match key {
                Key::Field(name) if name == "length" => Some(Self {
                    value: Value::from(items.len()),
                    writable: true,
                    enumerable: false,
                    configurable: false,
                }),
                key => key.as_index().and_then(|i| items.get(i).cloned()).map(Self::data),
            },
            _ => None,
        }
    }
}

/// Lazy sequence of the element nodes of an array-valued node
///
/// The length is taken when the sequence is created. Each call to
/// [`Children::iter`] starts over from index zero, and every item is the
/// parent's cached child node for that index.
#[derive(Debug, Clone)]
pub struct Children {
    node: Node,
    len: usize,
}

impl Children {
    pub fn new(node: Node, len: usize) -> Self {
        Self { node, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> ChildIter {
        ChildIter {
            node: self.node.clone(),
            next: 0,
            len: self.len,
        }
    }
}

impl IntoIterator for Children {
    type Item = Node;
    type IntoIter = ChildIter;

    fn into_iter(self) -> ChildIter {
        ChildIter {
            node: self.node,
            next: 0,
            len: self.len,
        }
    }
}

impl IntoIterator for &Children {
    type Item = Node;
    type IntoIter = ChildIter;

    fn into_iter(self) -> ChildIter {
        self.iter()
    }
}

pub struct ChildIter {
    node: Node,
    next: usize,
    len: usize,
}

impl Iterator for ChildIter {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if self.next >= self.len {
            return None;
        }
        let child = self.node.get(self.next);
        self.next += 1;
        Some(child)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChildIter {}

pub type Reader = Arc<dyn Fn() -> Value + Send + Sync>;
pub type Pusher = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;
pub type Failer = Arc<dyn Fn(StreamError) + Send + Sync>;
pub type Completer = Arc<dyn Fn() + Send + Sync>;
pub type Coercer = Arc<dyn Fn(Hint) -> Value + Send + Sync>;
pub type Describer = Arc<dyn Fn(&Key) -> Option<PropertyDescriptor> + Send + Sync>;

/// Result of an intercepted member access
#[derive(Clone)]
pub enum Handler {
    /// Current value, read at access time
    Value(Value),
    GetValue(Reader),
    Next(Pusher),
    Error(Failer),
    Complete(Completer),
    ToPrimitive(Coercer),
    Iterate(Children),
    ToJson(Reader),
    OwnKeys(Vec<Key>),
    PropertyDescriptor(Describer),
}

impl Handler {
    pub fn member(&self) -> Member {
        match self {
            Handler::Value(_) => Member::Value,
            Handler::GetValue(_) => Member::GetValue,
            Handler::Next(_) => Member::Next,
            Handler::Error(_) => Member::Error,
            Handler::Complete(_) => Member::Complete,
            Handler::ToPrimitive(_) => Member::ToPrimitive,
            Handler::Iterate(_) => Member::Iterate,
            Handler::ToJson(_) => Member::ToJson,
            Handler::OwnKeys(_) => Member::OwnKeys,
            Handler::PropertyDescriptor(_) => Member::PropertyDescriptor,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Handler::Iterate(children) => f.debug_tuple("Iterate").field(&children.len()).finish(),
            Handler::OwnKeys(keys) => f.debug_tuple("OwnKeys").field(keys).finish(),
            other => write!(f, "{:?}(..)", other.member()),
        }
    }
}

/// Decides which members are intercepted at a node
pub trait Overrides: Send + Sync + fmt::Debug {
    fn resolve(&self, node: &Node, member: Member) -> Option<Handler>;
}

/// Read-only streams: every access is projection
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverrides;

impl Overrides for NoOverrides {
    fn resolve(&self, _node: &Node, _member: Member) -> Option<Handler> {
        None
    }
}

/// Event sources: `next`, `error` and `complete` at the root only
///
/// Below the root those names are ordinary fields, so an emitted object
/// with a `next` field can still be projected.
#[derive(Debug, Clone)]
pub struct EventOverrides {
    subject: Subject<Value>,
}

impl EventOverrides {
    pub fn new(subject: Subject<Value>) -> Self {
        Self { subject }
    }
}

impl Overrides for EventOverrides {
    fn resolve(&self, node: &Node, member: Member) -> Option<Handler> {
        if !node.path().is_root() {
            return None;
        }
        let subject = self.subject.clone();
        match member {
            Member::Next => Some(Handler::Next(Arc::new(move |value: Value| -> Result<()> {
                subject.next(value);
                Ok(())
            }))),
            Member::Error => Some(Handler::Error(Arc::new(move |error: StreamError| {
                subject.error(error)
            }))),
            Member::Complete => Some(Handler::Complete(Arc::new(move || subject.complete()))),
            _ => None,
        }
    }
}

/// State sources: reads, writes and introspection at every path
///
/// `error` and `complete` resolve at any depth but always terminate the
/// root stream.
#[derive(Debug, Clone)]
pub struct StateOverrides {
    state: StateContainer,
}

impl StateOverrides {
    pub fn new(state: StateContainer) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &StateContainer {
        &self.state
    }
}

impl Overrides for StateOverrides {
    fn resolve(&self, node: &Node, member: Member) -> Option<Handler> {
        let state = self.state.clone();
        let path = node.path().clone();

        let handler = match member {
            Member::Value => Handler::Value(state.read(&path)),
            Member::GetValue => Handler::GetValue(Arc::new(move || state.read(&path))),
            Member::Next => Handler::Next(Arc::new(move |value: Value| -> Result<()> {
                state.write(&path, value)?;
                Ok(())
            })),
            Member::Error => Handler::Error(Arc::new(move |error: StreamError| state.error(error))),
            Member::Complete => Handler::Complete(Arc::new(move || state.complete())),
            Member::ToPrimitive => {
                Handler::ToPrimitive(Arc::new(move |hint: Hint| to_primitive(state.read(&path), hint)))
            }
            Member::ToJson => Handler::ToJson(Arc::new(move || state.read(&path))),
            Member::Iterate => match state.read(&path) {
                Value::Array(items) => Handler::Iterate(Children::new(node.clone(), items.len())),
                _ => return None,
            },
            Member::OwnKeys => Handler::OwnKeys(state.read(&path).own_keys()?),
            Member::PropertyDescriptor => {
                let current = state.read(&path);
                current.own_keys()?;
                Handler::PropertyDescriptor(Arc::new(move |key: &Key| {
                    PropertyDescriptor::of(&current, key)
                }))
            }
        };
        Some(handler)
    }
}

/// Primitive form of `value` for the given context
///
/// Dates become epoch milliseconds, or their RFC 3339 form when a string is
/// asked for. Everything else is returned as is.
pub fn to_primitive(value: Value, hint: Hint) -> Value {
    match (value, hint) {
        (Value::Date(date), Hint::String) => Value::string(date.to_rfc3339()),
        (Value::Date(date), _) => Value::Number(date.timestamp_millis() as f64),
        (value, _) => value,
    }
}
