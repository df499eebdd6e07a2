//! Reactive and read-only proxies.
//!
//! A [`Proxy`] is the observed view of a raw container. Reads through a proxy
//! call `track`, writes call `trigger`, and containers found while reading are
//! wrapped in a proxy of the same mode. Read-only proxies share every read
//! path with reactive ones; their mutators return [`Error::Readonly`].
//!
//! The operations themselves live next to the storage they touch:
//! objects and arrays in `base`, maps and sets in `collection`.

use std::fmt;
use std::rc::Rc;

use super::raw::{Entries, Fields, Items, Members, Raw, Shape};
use super::value::Value;
use crate::error::{Error, Result};
use crate::reactive::{Key, Runtime, Target, TargetId, TriggerOp};

pub(crate) struct ProxyCore<T: Shape> {
    raw: Raw<T>,
    readonly: bool,
}

impl<T: Shape> ProxyCore<T> {
    pub(crate) fn new(raw: Raw<T>, readonly: bool) -> Self {
        Self { raw, readonly }
    }
}

/// Observed view of a raw container.
///
/// Proxies are memoized per raw container and mode, so two proxies compare
/// equal exactly when they are the same view of the same container.
pub struct Proxy<T: Shape> {
    core: Rc<ProxyCore<T>>,
}

pub type ObjectProxy = Proxy<Fields>;
pub type ArrayProxy = Proxy<Items>;
pub type MapProxy = Proxy<Entries>;
pub type SetProxy = Proxy<Members>;

impl<T: Shape> Proxy<T> {
    pub(crate) fn from_core(core: Rc<ProxyCore<T>>) -> Self {
        Self { core }
    }

    /// The raw container behind this proxy.
    pub fn to_raw(&self) -> Raw<T> {
        self.core.raw.clone()
    }

    pub fn id(&self) -> TargetId {
        self.core.raw.id()
    }

    pub fn is_readonly(&self) -> bool {
        self.core.readonly
    }

    /// The read-only proxy of the same container.
    pub fn to_readonly(&self) -> Proxy<T> {
        self.core.raw.readonly()
    }

    pub(crate) fn raw(&self) -> &Raw<T> {
        &self.core.raw
    }

    pub(crate) fn track(&self, key: Key) {
        Runtime::track(&self.core.raw, key);
    }

    pub(crate) fn trigger(&self, op: TriggerOp, key: Key) {
        Runtime::trigger(&self.core.raw, op, key);
    }

    /// Reject a mutation through a read-only proxy.
    pub(crate) fn check_writable(&self, op: TriggerOp, key: impl FnOnce() -> Key) -> Result<()> {
        if !self.core.readonly {
            return Ok(());
        }
        let key = key();
        tracing::warn!(target_id = %self.id(), %op, %key, kind = T::KIND, "mutation of readonly proxy rejected");
        Err(Error::Readonly { op, key })
    }

    /// Wrap a value read from the container in this proxy's mode.
    pub(crate) fn wrap(&self, value: Value) -> Value {
        wrap(value, self.core.readonly)
    }
}

impl<T: Shape> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Shape> PartialEq for Proxy<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl<T: Shape> Eq for Proxy<T> {}

impl<T: Shape> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("kind", &T::KIND)
            .field("target", &self.id())
            .field("readonly", &self.is_readonly())
            .finish()
    }
}

impl<T: Shape> Target for Proxy<T> {
    fn target_id(&self) -> TargetId {
        self.core.raw.id()
    }

    fn iteration_key(&self) -> Key {
        T::ITERATION_KEY
    }
}

impl<T: Shape> From<Proxy<T>> for AnyProxy {
    fn from(proxy: Proxy<T>) -> Self {
        T::into_any(proxy)
    }
}

impl<T: Shape> From<Proxy<T>> for Value {
    fn from(proxy: Proxy<T>) -> Self {
        Value::Proxy(T::into_any(proxy))
    }
}

/// A proxy of any container family.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyProxy {
    Object(ObjectProxy),
    Array(ArrayProxy),
    Map(MapProxy),
    Set(SetProxy),
}

impl AnyProxy {
    pub fn kind(&self) -> &'static str {
        match self {
            AnyProxy::Object(_) => Fields::KIND,
            AnyProxy::Array(_) => Items::KIND,
            AnyProxy::Map(_) => Entries::KIND,
            AnyProxy::Set(_) => Members::KIND,
        }
    }

    pub fn is_readonly(&self) -> bool {
        match self {
            AnyProxy::Object(p) => p.is_readonly(),
            AnyProxy::Array(p) => p.is_readonly(),
            AnyProxy::Map(p) => p.is_readonly(),
            AnyProxy::Set(p) => p.is_readonly(),
        }
    }

    pub fn target_id(&self) -> TargetId {
        match self {
            AnyProxy::Object(p) => p.id(),
            AnyProxy::Array(p) => p.id(),
            AnyProxy::Map(p) => p.id(),
            AnyProxy::Set(p) => p.id(),
        }
    }

    /// The raw container as a value.
    pub fn raw(&self) -> Value {
        match self {
            AnyProxy::Object(p) => Value::Object(p.to_raw()),
            AnyProxy::Array(p) => Value::Array(p.to_raw()),
            AnyProxy::Map(p) => Value::Map(p.to_raw()),
            AnyProxy::Set(p) => Value::Set(p.to_raw()),
        }
    }

    pub fn to_readonly(&self) -> AnyProxy {
        match self {
            AnyProxy::Object(p) => AnyProxy::Object(p.to_readonly()),
            AnyProxy::Array(p) => AnyProxy::Array(p.to_readonly()),
            AnyProxy::Map(p) => AnyProxy::Map(p.to_readonly()),
            AnyProxy::Set(p) => AnyProxy::Set(p.to_readonly()),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectProxy> {
        match self {
            AnyProxy::Object(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayProxy> {
        match self {
            AnyProxy::Array(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapProxy> {
        match self {
            AnyProxy::Map(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetProxy> {
        match self {
            AnyProxy::Set(p) => Some(p),
            _ => None,
        }
    }
}

/// Wrap containers in a proxy of the requested mode; other values pass
/// through. A reactive proxy asked for read-only becomes its read-only twin.
pub(crate) fn wrap(value: Value, readonly: bool) -> Value {
    match value {
        Value::Object(raw) => raw.observe(readonly).into(),
        Value::Array(raw) => raw.observe(readonly).into(),
        Value::Map(raw) => raw.observe(readonly).into(),
        Value::Set(raw) => raw.observe(readonly).into(),
        Value::Proxy(proxy) if readonly && !proxy.is_readonly() => {
            Value::Proxy(proxy.to_readonly())
        }
        other => other,
    }
}

/// The reactive proxy for a container value.
///
/// A proxy passed in is returned as is, so a read-only proxy stays read-only.
pub fn reactive(target: &Value) -> Result<AnyProxy> {
    match target {
        Value::Object(raw) => Ok(raw.reactive().into()),
        Value::Array(raw) => Ok(raw.reactive().into()),
        Value::Map(raw) => Ok(raw.reactive().into()),
        Value::Set(raw) => Ok(raw.reactive().into()),
        Value::Proxy(proxy) => Ok(proxy.clone()),
        other => Err(Error::NotObservable { kind: other.kind() }),
    }
}

/// The read-only proxy for a container value.
///
/// Reactive proxies are unwrapped first, so `readonly(reactive(o))` is the
/// read-only proxy of `o`.
pub fn readonly(target: &Value) -> Result<AnyProxy> {
    match target {
        Value::Object(raw) => Ok(raw.readonly().into()),
        Value::Array(raw) => Ok(raw.readonly().into()),
        Value::Map(raw) => Ok(raw.readonly().into()),
        Value::Set(raw) => Ok(raw.readonly().into()),
        Value::Proxy(proxy) => Ok(proxy.to_readonly()),
        other => Err(Error::NotObservable { kind: other.kind() }),
    }
}

pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// True for reactive and read-only proxies alike.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Proxy(_))
}

pub fn is_readonly(value: &Value) -> bool {
    matches!(value, Value::Proxy(proxy) if proxy.is_readonly())
}

pub fn to_raw(value: &Value) -> Value {
    value.to_raw()
}

/// The current value of a ref (tracked), or the value itself.
pub fn unwrap(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}
