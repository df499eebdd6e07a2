//! Dynamic values stored in observable containers.
//!
//! [`Value`] is the element type of every raw object, array, map and set.
//! Containers are identity-bearing handles, so cloning a `Value` never copies
//! a container, and equality between containers is identity.

use std::fmt;
use std::rc::Rc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::proxy::AnyProxy;
use super::raw::{Array, Map, Object, Raw, Set, Shape};
use super::{ArrayProxy, MapProxy, ObjectProxy, SetProxy};
use crate::error::Result;
use crate::reactive::{Ref, TargetId};

/// A dynamically typed value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Object),
    Array(Array),
    Map(Map),
    Set(Set),
    /// A ref stored inside a container. Object reads unwrap it.
    Ref(Ref<Value>),
    /// A reactive or read-only view of a container.
    Proxy(AnyProxy),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Ref(_) => "ref",
            Value::Proxy(proxy) => proxy.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The ref held by this value, if any.
    pub fn as_value_ref(&self) -> Option<&Ref<Value>> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&AnyProxy> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// The object proxy held by this value. Raw objects return `None`.
    pub fn as_object(&self) -> Option<&ObjectProxy> {
        self.as_proxy().and_then(AnyProxy::as_object)
    }

    pub fn as_array(&self) -> Option<&ArrayProxy> {
        self.as_proxy().and_then(AnyProxy::as_array)
    }

    pub fn as_map(&self) -> Option<&MapProxy> {
        self.as_proxy().and_then(AnyProxy::as_map)
    }

    pub fn as_set(&self) -> Option<&SetProxy> {
        self.as_proxy().and_then(AnyProxy::as_set)
    }

    /// Strip any proxy, yielding the raw container (or the value itself).
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Proxy(proxy) => proxy.raw(),
            other => other.clone(),
        }
    }

    pub(crate) fn into_raw(self) -> Value {
        match self {
            Value::Proxy(proxy) => proxy.raw(),
            other => other,
        }
    }

    /// Identity of the container, ref or proxied target behind this value.
    pub fn target_id(&self) -> Option<TargetId> {
        match self {
            Value::Object(raw) => Some(raw.id()),
            Value::Array(raw) => Some(raw.id()),
            Value::Map(raw) => Some(raw.id()),
            Value::Set(raw) => Some(raw.id()),
            Value::Ref(r) => Some(r.id()),
            Value::Proxy(proxy) => Some(proxy.target_id()),
            _ => None,
        }
    }

    /// Strict equality: primitives by content, containers, refs and proxies
    /// by identity. `NaN` is unequal to itself and `-0.0` equals `0.0`.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Proxy(a), Value::Proxy(b)) => a == b,
            _ => false,
        }
    }

    /// Build raw containers from a JSON document.
    pub fn from_json(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    /// Untracked snapshot of this value as JSON.
    ///
    /// Refs contribute their current value, proxies their raw target. Cyclic
    /// structures are not supported.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A write is a no-op when old and new are strictly equal, or both `NaN`.
pub(crate) fn has_changed(old: &Value, new: &Value) -> bool {
    !(old.strict_eq(new) || (old.is_nan() && new.is_nan()))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Object(raw) => write!(f, "Object({})", raw.id()),
            Value::Array(raw) => write!(f, "Array({})", raw.id()),
            Value::Map(raw) => write!(f, "Map({})", raw.id()),
            Value::Set(raw) => write!(f, "Set({})", raw.id()),
            Value::Ref(r) => write!(f, "Ref({})", r.id()),
            Value::Proxy(proxy) => write!(
                f,
                "{}({}, {})",
                if proxy.is_readonly() { "Readonly" } else { "Reactive" },
                proxy.kind(),
                proxy.target_id()
            ),
        }
    }
}

// ----------------------------------------------------------------------------
// Map keys
// ----------------------------------------------------------------------------

/// Hashable key of a map entry or set member.
///
/// Keys compare with SameValueZero semantics: every `NaN` is the same key,
/// `-0.0` and `0.0` are the same key, containers and refs compare by
/// identity, and a proxy is the same key as its raw target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Null,
    Bool(bool),
    Number(u64),
    String(Rc<str>),
    Target(TargetId),
}

impl MapKey {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => MapKey::Null,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Number(n) if n.is_nan() => MapKey::Number(f64::NAN.to_bits()),
            Value::Number(n) if *n == 0.0 => MapKey::Number(0.0f64.to_bits()),
            Value::Number(n) => MapKey::Number(n.to_bits()),
            Value::String(s) => MapKey::String(Rc::clone(s)),
            Value::Object(raw) => MapKey::Target(raw.id()),
            Value::Array(raw) => MapKey::Target(raw.id()),
            Value::Map(raw) => MapKey::Target(raw.id()),
            Value::Set(raw) => MapKey::Target(raw.id()),
            Value::Ref(r) => MapKey::Target(r.id()),
            Value::Proxy(proxy) => MapKey::Target(proxy.target_id()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Null => f.write_str("null"),
            MapKey::Bool(b) => write!(f, "{b}"),
            MapKey::Number(bits) => write!(f, "{}", f64::from_bits(*bits)),
            MapKey::String(s) => write!(f, "{s:?}"),
            MapKey::Target(id) => write!(f, "{id}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

macro_rules! from_number {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(n: $ty) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}

from_number!(f64, f32, i32, i64, u32, u64, usize);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl<T: Shape> From<Raw<T>> for Value {
    fn from(raw: Raw<T>) -> Self {
        T::into_value(raw)
    }
}

impl From<Ref<Value>> for Value {
    fn from(r: Ref<Value>) -> Self {
        Value::Ref(r)
    }
}

impl From<AnyProxy> for Value {
    fn from(proxy: AnyProxy) -> Self {
        Value::Proxy(proxy)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
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
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

// ----------------------------------------------------------------------------
// Serialization
// ----------------------------------------------------------------------------

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Object(raw) => {
                let fields = raw.data();
                let mut map = serializer.serialize_map(Some(fields.0.len()))?;
                for (key, value) in fields.0.iter() {
                    map.serialize_entry(&**key, value)?;
                }
                map.end()
            }
            Value::Array(raw) => {
                let items = raw.data();
                let mut seq = serializer.serialize_seq(Some(items.0.len()))?;
                for item in items.0.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(raw) => {
                let entries = raw.data();
                let mut seq = serializer.serialize_seq(Some(entries.0.len()))?;
                for (key, value) in entries.0.values() {
                    seq.serialize_element(&(key, value))?;
                }
                seq.end()
            }
            Value::Set(raw) => {
                let members = raw.data();
                let mut seq = serializer.serialize_seq(Some(members.0.len()))?;
                for member in members.0.values() {
                    seq.serialize_element(member)?;
                }
                seq.end()
            }
            Value::Ref(r) => r.get_untracked().serialize(serializer),
            Value::Proxy(proxy) => proxy.raw().serialize(serializer),
        }
    }
}
