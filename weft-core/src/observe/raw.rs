//! Raw containers.
//!
//! A raw container is plain, untracked, identity-bearing storage. Reading or
//! writing it directly never touches the runtime; wrap it with
//! [`Raw::reactive`] or [`Raw::readonly`] to observe it. Each raw container
//! remembers the proxies created for it, so wrapping twice yields the same
//! proxy for as long as that proxy is alive.

use std::cell::{self, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::proxy::{AnyProxy, Proxy, ProxyCore};
use super::value::{MapKey, Value};
use crate::reactive::{Key, Runtime, Target, TargetId};

/// The storage layout behind one family of containers.
pub trait Shape: Default + Sized + 'static {
    /// Name used in errors and debug output.
    const KIND: &'static str;

    /// Key that insertions and removals additionally trigger.
    const ITERATION_KEY: Key;

    #[doc(hidden)]
    fn into_value(raw: Raw<Self>) -> Value;

    #[doc(hidden)]
    fn into_any(proxy: Proxy<Self>) -> AnyProxy;
}

/// Named fields of an object, in insertion order.
#[derive(Default)]
pub struct Fields(pub(crate) IndexMap<Rc<str>, Value>);

/// Items of an array.
#[derive(Default)]
pub struct Items(pub(crate) Vec<Value>);

/// Entries of a map: normalized key to `(original key, value)`.
#[derive(Default)]
pub struct Entries(pub(crate) IndexMap<MapKey, (Value, Value)>);

/// Members of a set: normalized key to the original member.
#[derive(Default)]
pub struct Members(pub(crate) IndexMap<MapKey, Value>);

impl Shape for Fields {
    const KIND: &'static str = "object";
    const ITERATION_KEY: Key = Key::Iterate;

    fn into_value(raw: Raw<Self>) -> Value {
        Value::Object(raw)
    }

    fn into_any(proxy: Proxy<Self>) -> AnyProxy {
        AnyProxy::Object(proxy)
    }
}

impl Shape for Items {
    const KIND: &'static str = "array";
    const ITERATION_KEY: Key = Key::Length;

    fn into_value(raw: Raw<Self>) -> Value {
        Value::Array(raw)
    }

    fn into_any(proxy: Proxy<Self>) -> AnyProxy {
        AnyProxy::Array(proxy)
    }
}

impl Shape for Entries {
    const KIND: &'static str = "map";
    const ITERATION_KEY: Key = Key::Iterate;

    fn into_value(raw: Raw<Self>) -> Value {
        Value::Map(raw)
    }

    fn into_any(proxy: Proxy<Self>) -> AnyProxy {
        AnyProxy::Map(proxy)
    }
}

impl Shape for Members {
    const KIND: &'static str = "set";
    const ITERATION_KEY: Key = Key::Iterate;

    fn into_value(raw: Raw<Self>) -> Value {
        Value::Set(raw)
    }

    fn into_any(proxy: Proxy<Self>) -> AnyProxy {
        AnyProxy::Set(proxy)
    }
}

pub(crate) struct RawCell<T: Shape> {
    id: TargetId,
    data: RefCell<T>,
    reactive: RefCell<Weak<ProxyCore<T>>>,
    readonly: RefCell<Weak<ProxyCore<T>>>,
}

impl<T: Shape> Drop for RawCell<T> {
    fn drop(&mut self) {
        Runtime::evict(self.id);
    }
}

/// Handle to a raw container. Clones share the same storage.
pub struct Raw<T: Shape>(Rc<RawCell<T>>);

pub type Object = Raw<Fields>;
pub type Array = Raw<Items>;
pub type Map = Raw<Entries>;
pub type Set = Raw<Members>;

impl<T: Shape> Raw<T> {
    pub fn new() -> Self {
        Self::with_data(T::default())
    }

    pub(crate) fn with_data(data: T) -> Self {
        Self(Rc::new(RawCell {
            id: TargetId::new(),
            data: RefCell::new(data),
            reactive: RefCell::new(Weak::new()),
            readonly: RefCell::new(Weak::new()),
        }))
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    /// The mutable proxy for this container.
    pub fn reactive(&self) -> Proxy<T> {
        self.observe(false)
    }

    /// The read-only proxy for this container.
    pub fn readonly(&self) -> Proxy<T> {
        self.observe(true)
    }

    pub(crate) fn observe(&self, readonly: bool) -> Proxy<T> {
        let slot = if readonly {
            &self.0.readonly
        } else {
            &self.0.reactive
        };

        if let Some(core) = slot.borrow().upgrade() {
            return Proxy::from_core(core);
        }

        let core = Rc::new(ProxyCore::new(self.clone(), readonly));
        *slot.borrow_mut() = Rc::downgrade(&core);
        Proxy::from_core(core)
    }

    pub(crate) fn data(&self) -> cell::Ref<'_, T> {
        self.0.data.borrow()
    }

    pub(crate) fn data_mut(&self) -> cell::RefMut<'_, T> {
        self.0.data.borrow_mut()
    }
}

impl<T: Shape> Default for Raw<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Shape> Clone for Raw<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

/// Raw containers compare by identity.
impl<T: Shape> PartialEq for Raw<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Shape> Eq for Raw<T> {}

impl<T: Shape> fmt::Debug for Raw<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Raw<{}>({})", T::KIND, self.0.id)
    }
}

impl<T: Shape> Target for Raw<T> {
    fn target_id(&self) -> TargetId {
        self.0.id
    }

    fn iteration_key(&self) -> Key {
        T::ITERATION_KEY
    }
}

// ----------------------------------------------------------------------------
// Untracked access
// ----------------------------------------------------------------------------

impl Raw<Fields> {
    /// Insert without notifying anyone. Proxies are stored as their raw target.
    pub fn insert(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.data_mut().0.insert(key.into(), value.into().into_raw())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data().0.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Raw<Items> {
    pub fn push(&self, value: impl Into<Value>) {
        self.data_mut().0.push(value.into().into_raw());
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.data().0.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Raw<Entries> {
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into().into_raw();
        self.data_mut()
            .0
            .insert(MapKey::of(&key), (key, value.into().into_raw()))
            .map(|(_, previous)| previous)
    }

    pub fn get(&self, key: impl Into<Value>) -> Option<Value> {
        let key = MapKey::of(&key.into());
        self.data().0.get(&key).map(|(_, value)| value.clone())
    }

    pub fn len(&self) -> usize {
        self.data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Raw<Members> {
    /// Returns false if the member was already present.
    pub fn insert(&self, value: impl Into<Value>) -> bool {
        let value = value.into().into_raw();
        let key = MapKey::of(&value);
        let mut members = self.data_mut();
        if members.0.contains_key(&key) {
            return false;
        }
        members.0.insert(key, value);
        true
    }

    pub fn contains(&self, value: impl Into<Value>) -> bool {
        self.data().0.contains_key(&MapKey::of(&value.into()))
    }

    pub fn len(&self) -> usize {
        self.data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Raw<Fields> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let raw = Self::new();
        for (key, value) in iter {
            raw.insert(key, value);
        }
        raw
    }
}

impl<V: Into<Value>> FromIterator<V> for Raw<Items> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::with_data(Items(
            iter.into_iter().map(|v| v.into().into_raw()).collect(),
        ))
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Raw<Entries> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let raw = Self::new();
        for (key, value) in iter {
            raw.insert(key, value);
        }
        raw
    }
}

impl<V: Into<Value>> FromIterator<V> for Raw<Members> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let raw = Self::new();
        for value in iter {
            raw.insert(value);
        }
        raw
    }
}
