#![forbid(unsafe_code)]

//! Dynamic view model shared by projections, merges and consumers.
//!
//! A derived view is a [`Props`] mapping from names to [`Value`]s. Mappings
//! are reference counted so that "the same view" has a concrete meaning:
//! two views are identical when they share storage ([`Props::ptr_eq`]).
//! Referential stability of unchanged views is the contract the selector
//! pipeline maintains for downstream consumers.
//!
//! # Identity vs. structure
//!
//! - [`Value::same`] is identity: scalars and strings compare by value,
//!   floats with `NaN` equal to itself and `0.0` distinct from `-0.0`.
//!   Lists, mappings, callbacks and opaque payloads compare by pointer.
//!   Shallow equality is built on top of it.
//! - `PartialEq` is structural and exists for assertions and diagnostics.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Shared callable stored inside a view (bound action creators, handlers).
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&[Value]) -> Value>);

impl Callback {
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the callback.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// A single entry of a derived view.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<[Value]>),
    Map(Props),
    Callback(Callback),
    /// Arbitrary typed payload, retrieved with [`Value::downcast_ref`].
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Wrap an arbitrary payload.
    pub fn opaque<T: Any>(value: T) -> Self {
        Self::Opaque(Rc::new(value))
    }

    /// Borrow the payload of an [`Value::Opaque`] if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Identity comparison.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Props::ptr_eq(a, b),
            (Self::Callback(a), Self::Callback(b)) => Callback::ptr_eq(a, b),
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether this value is a key/value mapping.
    #[must_use]
    pub fn is_plain_mapping(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    #[must_use]
    pub fn as_props(&self) -> Option<&Props> {
        match self {
            Self::Map(props) => Some(props),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Self::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
            Self::Callback(_) => "callback",
            Self::Opaque(_) => "opaque",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => f.debug_list().entries(items.iter()).finish(),
            Self::Map(props) => fmt::Debug::fmt(props, f),
            Self::Callback(cb) => fmt::Debug::fmt(cb, f),
            Self::Opaque(any) => write!(f, "Opaque({:p})", Rc::as_ptr(any).cast::<()>()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => self.same(other),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(Rc::from(v))
    }
}

impl From<Props> for Value {
    fn from(v: Props) -> Self {
        Self::Map(v)
    }
}

impl From<Callback> for Value {
    fn from(v: Callback) -> Self {
        Self::Callback(v)
    }
}

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

/// Reference-counted, ordered view mapping.
///
/// Cloning shares storage; [`Props::insert`] is copy-on-write, so a clone
/// handed to a consumer never observes later edits made through another
/// handle.
#[derive(Clone, Default)]
pub struct Props(Rc<BTreeMap<Rc<str>, Value>>);

impl Props {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        Rc::make_mut(&mut self.0).insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if !self.0.contains_key(key) {
            return None;
        }
        Rc::make_mut(&mut self.0).remove(key)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Copy every entry of `other` into `self`, overwriting existing keys.
    pub fn extend_from(&mut self, other: &Props) {
        if other.is_empty() {
            return;
        }
        let map = Rc::make_mut(&mut self.0);
        for (k, v) in other.0.iter() {
            map.insert(Rc::clone(k), v.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (&**k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| &**k)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        Props::ptr_eq(self, other) || self.0 == other.0
    }
}

impl<K, V> FromIterator<(K, V)> for Props
where
    K: Into<Rc<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(Rc::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }
}

/// Build a [`Props`] literal.
///
/// ```
/// use cascade_core::props;
///
/// let view = props! { "count" => 1, "label" => "clicks" };
/// assert_eq!(view.get("count").and_then(|v| v.as_int()), Some(1));
/// ```
#[macro_export]
macro_rules! props {
    () => { $crate::value::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        <$crate::value::Props as ::std::iter::FromIterator<(&str, $crate::value::Value)>>::from_iter([
            $(($key, $crate::value::Value::from($value))),+
        ])
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
