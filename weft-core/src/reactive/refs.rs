//! Ref Implementation
//!
//! A Ref is a single boxed reactive value. Reading it inside an effect
//! registers the effect under the ref's synthetic `"value"` key; writing it
//! triggers that key.
//!
//! # Nested values
//!
//! Values stored in a ref go through [`ToReactive`] on construction and on
//! every assignment. Plain Rust values pass through unchanged; dynamic
//! [`Value`] containers are wrapped in a reactive proxy so that mutations
//! made through the ref's value are tracked too.
//!
//! Typed containers keep their type: a [`Raw`] container or a [`Proxy`] is
//! stored as given. Store `raw.reactive()` (or a [`Value`]) to have
//! mutations of the contents tracked.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::runtime::Runtime;
use super::target::{Key, Target, TargetId, TriggerOp};
use crate::observe::{AnyProxy, Proxy, Raw, Shape, Value};

/// Conversion applied to every value stored in a [`Ref`].
pub trait ToReactive: Sized {
    fn to_reactive(self) -> Self {
        self
    }
}

macro_rules! plain_values {
    ($($ty:ty),* $(,)?) => {
        $(impl ToReactive for $ty {})*
    };
}

plain_values!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str, Rc<str>,
);

impl<T> ToReactive for Vec<T> {}

impl<T: ToReactive> ToReactive for Option<T> {
    fn to_reactive(self) -> Self {
        self.map(ToReactive::to_reactive)
    }
}

impl ToReactive for Value {
    fn to_reactive(self) -> Self {
        crate::observe::wrap(self, false)
    }
}

impl<T: Shape> ToReactive for Raw<T> {}

impl<T: Shape> ToReactive for Proxy<T> {}

impl ToReactive for AnyProxy {}

struct RefInner<T> {
    id: TargetId,
    value: RefCell<T>,
}

impl<T> Drop for RefInner<T> {
    fn drop(&mut self) {
        Runtime::evict(self.id);
    }
}

/// A single boxed reactive value.
///
/// Clones share the same slot.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Ref;
///
/// let count = Ref::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Ref<T: 'static> {
    inner: Rc<RefInner<T>>,
}

impl<T: ToReactive + 'static> Ref<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefInner {
                id: TargetId::new(),
                value: RefCell::new(value.to_reactive()),
            }),
        }
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Read the value, registering the active effect as a dependent.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        Runtime::track(self, Key::VALUE);
        self.inner.value.borrow().clone()
    }

    /// Read the value without establishing a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Borrow the value for the duration of `f`, tracking the read.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        Runtime::track(self, Key::VALUE);
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify dependents.
    ///
    /// Every assignment triggers, even when the new value equals the old one.
    pub fn set(&self, value: T) {
        let previous = self.inner.value.replace(value.to_reactive());
        drop(previous);
        Runtime::trigger(self, TriggerOp::Set, Key::VALUE);
    }

    /// Update the value using a function of the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }

    /// Number of effects currently depending on this ref.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self, &Key::VALUE)
    }
}

impl<T: 'static> Target for Ref<T> {
    fn target_id(&self) -> TargetId {
        self.inner.id
    }
}

impl<T: 'static> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Refs compare by identity.
impl<T: 'static> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Debug + 'static> Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.value.try_borrow() {
            Ok(value) => f
                .debug_struct("Ref")
                .field("id", &self.inner.id)
                .field("value", &*value)
                .finish(),
            Err(_) => f
                .debug_struct("Ref")
                .field("id", &self.inner.id)
                .finish_non_exhaustive(),
        }
    }
}

/// Common surface of [`Ref`] and [`Computed`](super::Computed).
pub trait RefLike<T> {
    fn get(&self) -> T;
    fn set(&self, value: T);
}

impl<T: ToReactive + Clone + 'static> RefLike<T> for Ref<T> {
    fn get(&self) -> T {
        Ref::get(self)
    }

    fn set(&self, value: T) {
        Ref::set(self, value)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
