//! Tagged value model for emitted values
//!
//! Composite variants are reference counted: cloning a `Value` never deep
//! copies, and copy-on-write updates can share untouched substructure.

use crate::path::Key;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use std::sync::Arc;

/// Object payload: insertion-ordered fields
pub type Map = IndexMap<String, Value>;

/// Signature of a native callable: `(receiver, arguments) -> result`
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Value + Send + Sync;

/// A callable value with an optional bound receiver
///
/// The receiver is the value the callable was read from; it is what the
/// callable sees as its calling context.
#[derive(Clone)]
pub struct Function {
    func: Arc<NativeFn>,
    receiver: Option<Arc<Value>>,
}

impl Function {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            receiver: None,
        }
    }

    /// Callable that ignores its receiver
    pub fn from_args<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::new(move |_this, args| func(args))
    }

    /// Same callable bound to `receiver`
    pub fn bind(&self, receiver: Value) -> Self {
        Self {
            func: self.func.clone(),
            receiver: Some(Arc::new(receiver)),
        }
    }

    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_deref()
    }

    pub fn call(&self, args: &[Value]) -> Value {
        let this = self.receiver.as_deref().unwrap_or(&Value::Absent);
        (self.func)(this, args)
    }

    fn same_callable(&self, other: &Function) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.func) as *const (),
            Arc::as_ptr(&other.func) as *const (),
        )
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.same_callable(other) && self.receiver == other.receiver
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ptr = Arc::as_ptr(&self.func) as *const ();
        f.debug_struct("Function")
            .field("ptr", &ptr)
            .field("bound", &self.receiver.is_some())
            .finish()
    }
}

/// A dynamically shaped value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Missing value (`undefined`)
    #[default]
    Absent,
    /// Explicit null
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Date(DateTime<Utc>),
    Array(Arc<Vec<Value>>),
    Object(Arc<Map>),
    Function(Function),
}

impl Value {
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + Send + Sync + 'static,
    {
        Value::Function(Function::new(func))
    }

    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// `Absent` or `Null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Absent | Value::Null)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(&**map),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Read one key out of this value
    ///
    /// Nullish receivers yield themselves so a chain of lookups keeps the
    /// first nullish marker it met. Keys that do not apply yield `Absent`.
    pub fn get(&self, key: &Key) -> Value {
        match (self, key) {
            (Value::Absent, _) | (Value::Null, _) => self.clone(),
            (_, Key::Symbol(_)) => Value::Absent,
            (Value::Object(map), key) => key
                .as_field()
                .and_then(|name| map.get(&name).cloned())
                .unwrap_or(Value::Absent),
            (Value::Array(items), Key::Field(name)) if name == "length" => {
                Value::Number(items.len() as f64)
            }
            (Value::Array(items), key) => key
                .as_index()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Absent),
            (Value::String(s), Key::Field(name)) if name == "length" => {
                Value::Number(s.chars().count() as f64)
            }
            (Value::String(s), key) => key
                .as_index()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::string(c.to_string()))
                .unwrap_or(Value::Absent),
            _ => Value::Absent,
        }
    }

    /// Own enumerable keys of objects and arrays
    pub fn own_keys(&self) -> Option<Vec<Key>> {
        match self {
            Value::Object(map) => Some(map.keys().map(Key::field).collect()),
            Value::Array(items) => Some((0..items.len()).map(Key::Index).collect()),
            _ => None,
        }
    }

    /// Reference identity for composites, value equality for scalars
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Array(x), Value::Array(y)) => Arc::ptr_eq(x, y),
            (Value::Object(x), Value::Object(y)) => Arc::ptr_eq(x, y),
            (Value::String(x), Value::String(y)) => Arc::ptr_eq(x, y) || x == y,
            (Value::Function(x), Value::Function(y)) => x == y,
            _ => a == b,
        }
    }

    /// Numeric coercion used by arithmetic contexts
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Absent => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) if s.trim().is_empty() => 0.0,
            Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::Date(date) => date.timestamp_millis() as f64,
            Value::Array(_) | Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}Infinity", if n < 0.0 { "-" } else { "" })
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

/// String coercion
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => format_number(*n, f),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(date) => write!(f, "{}", date.to_rfc3339()),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(_) => write!(f, "function"),
        }
    }
}

/// Arithmetic coercion: string operands concatenate, everything else adds
/// numerically (dates as epoch milliseconds).
impl Add for Value {
    type Output = Value;

    fn add(self, rhs: Value) -> Value {
        match (&self, &rhs) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::string(format!("{}{}", self, rhs))
            }
            _ => Value::Number(self.to_number() + rhs.to_number()),
        }
    }
}

fn skipped_in_json(value: &Value) -> bool {
    matches!(value, Value::Absent | Value::Function(_))
}

/// JSON-style encoding: absent fields and functions are omitted from
/// objects and encode as null elsewhere.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Absent | Value::Null | Value::Function(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if !n.is_finite() => serializer.serialize_unit(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(date) => serializer.serialize_str(&date.to_rfc3339()),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let fields: Vec<_> = map.iter().filter(|(_, v)| !skipped_in_json(v)).collect();
                let mut out = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(Arc::new(map))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from))
            }
            serde_json::Value::Object(fields) => {
                Value::object(fields.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_get_fields_and_indices() {
        let v = Value::from(json!({ "a": { "b": [10, 20] }, "s": "Hi" }));

        let b = v.get(&Key::field("a")).get(&Key::field("b"));
        assert_eq!(b.get(&Key::Index(1)), Value::from(20));
        assert_eq!(b.get(&Key::field("0")), Value::from(10));
        assert_eq!(b.get(&Key::field("length")), Value::from(2));
        assert_eq!(v.get(&Key::field("s")).get(&Key::field("length")), Value::from(2));
        assert_eq!(v.get(&Key::field("s")).get(&Key::Index(0)), Value::from("H"));
        assert!(v.get(&Key::field("missing")).is_absent());
    }

    #[test]
    fn test_nullish_propagates_itself() {
        assert_eq!(Value::Null.get(&Key::field("x")), Value::Null);
        assert_eq!(Value::Absent.get(&Key::field("x")), Value::Absent);
        assert!(Value::from(3).get(&Key::field("x")).is_absent());
    }

    #[test]
    fn test_bound_function_sees_receiver() {
        let read_b = Function::new(|this, _| this.get(&Key::field("b")));
        let holder = Value::object([("b", Value::from(7))]);

        assert!(read_b.call(&[]).is_absent());
        assert_eq!(read_b.bind(holder).call(&[]), Value::from(7));
    }

    #[test]
    fn test_function_equality_is_by_allocation() {
        let f = Function::from_args(|_| Value::Null);
        let g = Function::from_args(|_| Value::Null);

        assert_eq!(f, f.clone());
        assert_ne!(f, g);
        assert_ne!(f, f.bind(Value::from(1)));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(Value::from(10) + Value::from(2), Value::from(12));
        assert_eq!(Value::from("Hello, ") + Value::from("world!"), Value::from("Hello, world!"));
        assert_eq!(Value::from("n=") + Value::from(1.5), Value::from("n=1.5"));

        let date = Utc.timestamp_millis_opt(1_000).unwrap();
        assert_eq!(Value::from(date) + Value::from(1), Value::from(1_001));
        assert_eq!(Value::array([Value::from(1), Value::Null]).to_string(), "1,");
    }

    #[test]
    fn test_own_keys() {
        let v = Value::from(json!({ "x": 1, "y": [1, 2] }));
        assert_eq!(v.own_keys(), Some(vec![Key::field("x"), Key::field("y")]));
        assert_eq!(
            v.get(&Key::field("y")).own_keys(),
            Some(vec![Key::Index(0), Key::Index(1)])
        );
        assert_eq!(Value::from(1).own_keys(), None);
    }

    #[test]
    fn test_serialize_skips_functions() {
        let v = Value::object([
            ("a", Value::from(1)),
            ("f", Value::function(|_, _| Value::Null)),
            ("gone", Value::Absent),
            ("n", Value::from(0.5)),
        ]);
        insta::assert_snapshot!(serde_json::to_string(&v).unwrap(), @r#"{"a":1,"n":0.5}"#);
    }
}
