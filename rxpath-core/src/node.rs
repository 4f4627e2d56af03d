//! Projection nodes
//!
//! A [`Node`] describes how to derive one stream from a root source: the
//! root stream mapped through the node's path. Navigating with
//! [`Node::get`] returns the same child node for the same key every time,
//! while [`Node::pipe`] and [`Node::call`] always build a fresh hierarchy.

use crate::error::{ProxyError, Result};
use crate::options::ProxyOptions;
use crate::overrides::{
    Children, EventOverrides, Handler, Hint, Member, NoOverrides, Overrides, PropertyDescriptor,
    StateOverrides,
};
use crate::pluck;
use crate::state::StateContainer;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rxpath_stream::{
    BehaviorSubject, Observable, Observer, Operator, StreamError, Subject, Subscription,
};
use rxpath_types::{Key, Path, Value};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The kind of root a hierarchy was built over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Read-only stream, including the results of `pipe` and `call`
    Stream,
    /// Multicast event source without replay
    Events,
    /// Replaying state source with read and write access
    State,
}

struct NodeInner {
    source: Observable<Value>,
    path: Path,
    overrides: Arc<dyn Overrides>,
    distinct: bool,
    kind: SourceKind,
    children: Mutex<HashMap<Key, Node>>,
    projected: OnceCell<Observable<Value>>,
}

/// Handle to one position in a projection hierarchy
///
/// Clones refer to the same node, and equality is identity.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

/// Outcome of a member access
#[derive(Debug, Clone)]
pub enum Access {
    /// The member was intercepted
    Handler(Handler),
    /// The member was projected as a child node
    Node(Node),
}

impl Access {
    pub fn into_node(self) -> Option<Node> {
        match self {
            Access::Node(node) => Some(node),
            Access::Handler(_) => None,
        }
    }

    pub fn into_handler(self) -> Option<Handler> {
        match self {
            Access::Handler(handler) => Some(handler),
            Access::Node(_) => None,
        }
    }
}

impl Node {
    fn build(
        source: Observable<Value>,
        path: Path,
        overrides: Arc<dyn Overrides>,
        distinct: bool,
        kind: SourceKind,
    ) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                source,
                path,
                overrides,
                distinct,
                kind,
                children: Mutex::new(HashMap::new()),
                projected: OnceCell::new(),
            }),
        }
    }

    fn root(
        source: Observable<Value>,
        overrides: Arc<dyn Overrides>,
        distinct: bool,
        kind: SourceKind,
    ) -> Self {
        tracing::debug!(?kind, distinct, "creating root node");
        Self::build(source, Path::root(), overrides, distinct, kind)
    }

    /// Node over a read-only stream
    pub fn stream_source(source: Observable<Value>, options: ProxyOptions) -> Self {
        Self::root(source, Arc::new(NoOverrides), options.distinct, SourceKind::Stream)
    }

    /// Node over a multicast event source
    pub fn event_source(subject: Subject<Value>, options: ProxyOptions) -> Self {
        let source = subject.as_observable();
        Self::root(
            source,
            Arc::new(EventOverrides::new(subject)),
            options.distinct,
            SourceKind::Events,
        )
    }

    /// Node over a replaying state source
    pub fn state_source(subject: BehaviorSubject<Value>, options: ProxyOptions) -> Self {
        let state = StateContainer::new(subject, options.distinct);
        Self::root(
            state.observable(),
            Arc::new(StateOverrides::new(state)),
            options.distinct,
            SourceKind::State,
        )
    }

    // Result node of `pipe` and `call`: the projection is already applied.
    fn derived(source: Observable<Value>) -> Self {
        Self::root(source, Arc::new(NoOverrides), false, SourceKind::Stream)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn kind(&self) -> SourceKind {
        self.inner.kind
    }

    pub fn is_distinct(&self) -> bool {
        self.inner.distinct
    }

    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Child node one key below this one
    ///
    /// The child is created on first access and cached for the lifetime of
    /// this node.
    pub fn get(&self, key: impl Into<Key>) -> Node {
        let key = key.into();
        let mut children = self.inner.children.lock();
        if let Some(child) = children.get(&key) {
            return child.clone();
        }

        let path = self.inner.path.child(key.clone());
        tracing::trace!(%path, "creating child node");
        let child = Self::build(
            self.inner.source.clone(),
            path,
            self.inner.overrides.clone(),
            self.inner.distinct,
            self.inner.kind,
        );
        children.insert(key, child.clone());
        child
    }

    /// Descendant node at `path` relative to this one
    pub fn at(&self, path: &Path) -> Node {
        path.iter()
            .fold(self.clone(), |node, key| node.get(key.clone()))
    }

    /// Member access: an intercepted member, or the child node for `key`
    pub fn member(&self, key: impl Into<Key>) -> Access {
        let key = key.into();
        match Member::from_key(&key).and_then(|member| self.resolve(member)) {
            Some(handler) => Access::Handler(handler),
            None => Access::Node(self.get(key)),
        }
    }

    fn resolve(&self, member: Member) -> Option<Handler> {
        self.inner.overrides.resolve(self, member)
    }

    fn unsupported(&self, member: Member) -> ProxyError {
        ProxyError::Unsupported {
            member,
            path: self.inner.path.clone(),
        }
    }

    /// The projected stream of this node
    ///
    /// Built once; every call returns the same observable.
    pub fn stream(&self) -> Observable<Value> {
        self.inner
            .projected
            .get_or_init(|| {
                let projected = pluck::project(&self.inner.source, &self.inner.path);
                if self.inner.distinct {
                    projected.distinct_until_changed()
                } else {
                    projected
                }
            })
            .clone()
    }

    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer<Value> + 'static,
    {
        self.stream().subscribe(observer)
    }

    /// Treat each projected value as a callable and emit its result
    ///
    /// Non-callable values produce `Null`.
    pub fn call(&self, args: Vec<Value>) -> Node {
        let args: Arc<[Value]> = args.into();
        Node::derived(self.stream().map(move |value| match value {
            Value::Function(func) => func.call(&args),
            _ => Value::Null,
        }))
    }

    /// Apply one stage to the projected stream
    pub fn pipe<F>(&self, stage: F) -> Node
    where
        F: FnOnce(Observable<Value>) -> Observable<Value>,
    {
        Node::derived(stage(self.stream()))
    }

    /// Apply a sequence of stages to the projected stream
    pub fn pipe_all<I>(&self, stages: I) -> Node
    where
        I: IntoIterator<Item = Operator<Value>>,
    {
        Node::derived(self.stream().pipe_all(stages))
    }

    /// Current value, for state nodes
    pub fn value(&self) -> Result<Value> {
        match self.resolve(Member::Value) {
            Some(Handler::Value(value)) => Ok(value),
            _ => Err(self.unsupported(Member::Value)),
        }
    }

    /// Reader of the current value, for state nodes
    pub fn get_value(&self) -> Result<Value> {
        match self.resolve(Member::GetValue) {
            Some(Handler::GetValue(read)) => Ok(read()),
            _ => Err(self.unsupported(Member::GetValue)),
        }
    }

    /// Push a value
    ///
    /// On an event root this publishes `value`. On a state node it writes
    /// `value` at the node's path.
    pub fn next(&self, value: impl Into<Value>) -> Result<()> {
        match self.resolve(Member::Next) {
            Some(Handler::Next(push)) => push(value.into()),
            _ => Err(self.unsupported(Member::Next)),
        }
    }

    pub fn error(&self, error: impl Into<StreamError>) -> Result<()> {
        match self.resolve(Member::Error) {
            Some(Handler::Error(fail)) => {
                fail(error.into());
                Ok(())
            }
            _ => Err(self.unsupported(Member::Error)),
        }
    }

    pub fn complete(&self) -> Result<()> {
        match self.resolve(Member::Complete) {
            Some(Handler::Complete(complete)) => {
                complete();
                Ok(())
            }
            _ => Err(self.unsupported(Member::Complete)),
        }
    }

    /// Assign `value` to the field `key` below this state node
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        if self.inner.kind != SourceKind::State {
            return Err(self.unsupported(Member::Next));
        }
        self.get(key).next(value)
    }

    /// Element nodes of an array-valued state node
    pub fn children(&self) -> Result<Children> {
        match self.resolve(Member::Iterate) {
            Some(Handler::Iterate(children)) => Ok(children),
            _ => Err(self.unsupported(Member::Iterate)),
        }
    }

    /// Own keys of the current value
    pub fn keys(&self) -> Result<Vec<Key>> {
        match self.resolve(Member::OwnKeys) {
            Some(Handler::OwnKeys(keys)) => Ok(keys),
            _ => Err(self.unsupported(Member::OwnKeys)),
        }
    }

    /// Own property descriptor of `key` on the current value
    pub fn descriptor(&self, key: impl Into<Key>) -> Result<Option<PropertyDescriptor>> {
        match self.resolve(Member::PropertyDescriptor) {
            Some(Handler::PropertyDescriptor(describe)) => Ok(describe(&key.into())),
            _ => Err(self.unsupported(Member::PropertyDescriptor)),
        }
    }

    pub fn to_primitive(&self, hint: Hint) -> Result<Value> {
        match self.resolve(Member::ToPrimitive) {
            Some(Handler::ToPrimitive(coerce)) => Ok(coerce(hint)),
            _ => Err(self.unsupported(Member::ToPrimitive)),
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        match self.resolve(Member::ToJson) {
            Some(Handler::ToJson(read)) => Ok(read()),
            _ => Err(self.unsupported(Member::ToJson)),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Node::ptr_eq(self, other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.inner.path)
            .field("kind", &self.inner.kind)
            .field("distinct", &self.inner.distinct)
            .field("overrides", &self.inner.overrides)
            .finish()
    }
}

/// String coercion of the current value; nodes without one render their path
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_primitive(Hint::String) {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "[node {}]", self.inner.path),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.to_json() {
            Ok(value) => value.serialize(serializer),
            Err(err) => Err(S::Error::custom(err)),
        }
    }
}

impl From<&Node> for Observable<Value> {
    fn from(node: &Node) -> Self {
        node.stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxpath_stream::{of, CollectingObserver};
    use rxpath_types::path;

    fn plain(values: Vec<Value>) -> Node {
        Node::stream_source(of(values), ProxyOptions::default())
    }

    #[test]
    fn test_get_is_cached() {
        let node = plain(vec![]);
        assert_eq!(node.get("a"), node.get("a"));
        assert_eq!(node.get("a").get("b"), node.at(&path!["a", "b"]));
        assert_ne!(node.get("a"), node.get("b"));
        assert_eq!(node.get("a").path(), &path!["a"]);
    }

    #[test]
    fn test_pipe_is_never_cached() {
        let node = plain(vec![]);
        let first = node.pipe(|s| s);
        let second = node.pipe(|s| s);
        assert_ne!(first, second);
        assert!(first.path().is_root());
        assert_eq!(first.kind(), SourceKind::Stream);
    }

    #[test]
    fn test_stream_is_built_once() {
        let node = plain(vec![]).get("a");
        assert!(Observable::ptr_eq(&node.stream(), &node.stream()));
    }

    #[test]
    fn test_member_falls_through_without_overrides() {
        let node = plain(vec![Value::object([("value", Value::from(4))])]);
        let Access::Node(child) = node.member("value") else {
            panic!("plain streams intercept nothing");
        };
        assert_eq!(child, node.get("value"));

        let observer = CollectingObserver::new();
        child.subscribe(observer.clone());
        assert_eq!(observer.values(), vec![Value::from(4)]);
    }

    #[test]
    fn test_typed_helpers_unsupported_on_streams() {
        let node = plain(vec![]);
        assert!(matches!(
            node.value(),
            Err(ProxyError::Unsupported {
                member: Member::Value,
                ..
            })
        ));
        assert!(node.next(1).is_err());
        assert!(node.set("a", 1).is_err());
        assert!(node.children().is_err());
        assert_eq!(node.to_string(), "[node <root>]");
    }

    #[test]
    fn test_call_non_callable_yields_null() {
        let observer = CollectingObserver::new();
        plain(vec![Value::from(1), Value::Absent])
            .call(vec![])
            .subscribe(observer.clone());

        assert_eq!(observer.values(), vec![Value::Null, Value::Null]);
        assert!(observer.is_completed());
    }
}
