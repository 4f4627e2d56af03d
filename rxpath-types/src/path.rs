//! Keys and paths addressing nested locations inside a [`Value`](crate::Value).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known symbolic marker
///
/// Symbols never collide with field names, so members such as iteration or
/// primitive coercion can be addressed without shadowing user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Symbol(&'static str);

impl Symbol {
    /// Iteration protocol marker
    pub const ITERATOR: Symbol = Symbol("Symbol.iterator");

    /// Primitive coercion marker
    pub const TO_PRIMITIVE: Symbol = Symbol("Symbol.toPrimitive");

    /// Own-key enumeration marker
    pub const OWN_KEYS: Symbol = Symbol("Symbol.ownKeys");

    /// Own property descriptor marker
    pub const PROPERTY_DESCRIPTOR: Symbol = Symbol("Symbol.propertyDescriptor");

    pub fn description(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@@{}", self.0.trim_start_matches("Symbol."))
    }
}

/// A single path key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Named field
    Field(String),
    /// Sequence index
    Index(usize),
    /// Well-known marker
    #[serde(skip_deserializing)]
    Symbol(Symbol),
}

impl Key {
    pub fn field(name: impl Into<String>) -> Self {
        Key::Field(name.into())
    }

    /// Index view of this key, parsing numeric field names
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Field(name) => name.parse().ok(),
            Key::Symbol(_) => None,
        }
    }

    /// Field-name view of this key, stringifying indices
    pub fn as_field(&self) -> Option<String> {
        match self {
            Key::Field(name) => Some(name.clone()),
            Key::Index(i) => Some(i.to_string()),
            Key::Symbol(_) => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Key::Symbol(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => write!(f, "{}", name),
            Key::Index(i) => write!(f, "{}", i),
            Key::Symbol(sym) => write!(f, "{}", sym),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::Field(name.clone())
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

// Integer literals default to i32, so `node.get(0)` lands here.
impl From<i32> for Key {
    fn from(i: i32) -> Self {
        match usize::try_from(i) {
            Ok(index) => Key::Index(index),
            Err(_) => Key::Field(i.to_string()),
        }
    }
}

impl From<Symbol> for Key {
    fn from(sym: Symbol) -> Self {
        Key::Symbol(sym)
    }
}

/// Ordered sequence of keys; the empty path denotes the root value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path(Vec<Key>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_keys(keys: Vec<Key>) -> Self {
        Self(keys)
    }

    /// New path with one more key appended
    pub fn child(&self, key: impl Into<Key>) -> Path {
        let mut keys = Vec::with_capacity(self.0.len() + 1);
        keys.extend(self.0.iter().cloned());
        keys.push(key.into());
        Path(keys)
    }

    /// Concatenate another path onto this one
    pub fn join(&self, other: &Path) -> Path {
        let mut keys = self.0.clone();
        keys.extend(other.0.iter().cloned());
        Path(keys)
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }

    /// Path without its last key, or `None` at the root
    pub fn parent(&self) -> Option<Path> {
        self.0
            .split_last()
            .map(|(_, init)| Path(init.to_vec()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, key) in self.0.iter().enumerate() {
            match key {
                Key::Index(index) => write!(f, "[{}]", index)?,
                Key::Symbol(sym) => write!(f, "[{}]", sym)?,
                Key::Field(name) if i == 0 => write!(f, "{}", name)?,
                Key::Field(name) => write!(f, ".{}", name)?,
            }
        }
        Ok(())
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Construct a [`Path`] from a list of keys.
///
/// ```
/// use rxpath_types::{path, Key};
///
/// let p = path!["users", 0, "name"];
/// assert_eq!(p.keys()[1], Key::Index(0));
/// assert_eq!(p.to_string(), "users[0].name");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($key:expr),+ $(,)?) => {
        $crate::Path::from_keys(vec![$($crate::Key::from($key)),+])
    };
}
