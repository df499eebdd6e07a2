//! Computed Implementation
//!
//! A Computed is a cached derived value that recomputes lazily.
//!
//! # How Computeds Work
//!
//! 1. The computed owns a lazy effect flagged `computed` whose scheduler only
//!    sets a dirty flag. Nothing runs on creation.
//!
//! 2. When a dependency changes, the runtime schedules computed effects before
//!    plain ones, so the dirty flag is already set by the time any plain effect
//!    reruns and reads the computed.
//!
//! 3. On read, a dirty computed reruns its getter, caches the result and
//!    clears the flag. A clean computed returns the cache.
//!
//! 4. After every read inside an effect, the computed's dependency sets are
//!    merged into that effect, so the outer effect reruns whenever the
//!    computed's sources change.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::effect::{Effect, EffectOptions};
use super::refs::RefLike;
use super::runtime::Runtime;

struct ComputedInner<T: 'static> {
    effect: Effect<T>,
    value: RefCell<Option<T>>,
    dirty: Rc<Cell<bool>>,
    setter: Option<Box<dyn Fn(T)>>,
}

/// A lazily recomputed value derived from other reactive state.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::{Computed, Ref};
///
/// let count = Ref::new(2);
/// let count_clone = count.clone();
/// let doubled = Computed::new(move || count_clone.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a read-only computed. The getter does not run until first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(getter, None)
    }

    /// Create a computed whose writes are forwarded to `setter`.
    pub fn with_setter<F, S>(getter: F, setter: S) -> Self
    where
        F: Fn() -> T + 'static,
        S: Fn(T) + 'static,
    {
        Self::build(getter, Some(Box::new(setter)))
    }

    fn build<F>(getter: F, setter: Option<Box<dyn Fn(T)>>) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let dirty = Rc::new(Cell::new(true));
        let dirty_clone = Rc::clone(&dirty);
        let effect = Effect::with_options(
            getter,
            EffectOptions::new()
                .lazy()
                .computed()
                .scheduler(move |_job| dirty_clone.set(true)),
        );

        Self {
            inner: Rc::new(ComputedInner {
                effect,
                value: RefCell::new(None),
                dirty,
                setter,
            }),
        }
    }

    /// Get the current value, recomputing first if a dependency changed.
    ///
    /// # Panics
    ///
    /// Panics if the getter reads its own computed.
    pub fn get(&self) -> T {
        if self.inner.dirty.get() {
            if let Some(value) = self.inner.effect.run() {
                *self.inner.value.borrow_mut() = Some(value);
                self.inner.dirty.set(false);
            }
        }

        Runtime::adopt(self.inner.effect.subscriber());

        self.inner
            .value
            .borrow()
            .clone()
            .expect("computed value read during its own evaluation")
    }

    /// Forward `value` to the setter, if one was supplied.
    pub fn set(&self, value: T) {
        match &self.inner.setter {
            Some(setter) => setter(value),
            None => tracing::warn!(
                effect = %self.inner.effect.id(),
                "write to a computed without a setter ignored"
            ),
        }
    }

    /// Check whether the next read recomputes.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Check if the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// The internal lazy effect.
    pub fn effect(&self) -> &Effect<T> {
        &self.inner.effect
    }

    /// Detach from every dependency; the cached value is kept.
    pub fn stop(&self) {
        self.inner.effect.stop();
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> RefLike<T> for Computed<T> {
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn set(&self, value: T) {
        Computed::set(self, value)
    }
}

impl<T: Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("effect", &self.inner.effect.id())
            .field("dirty", &self.inner.dirty.get())
            .field("value", &self.inner.value.try_borrow().ok())
            .finish()
    }
}

/// Create a read-only [`Computed`].
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Ref;

    #[test]
    fn computed_is_lazy() {
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let computed = Computed::new(move || {
            call_count_clone.set(call_count_clone.get() + 1);
            42
        });

        // Not computed yet
        assert!(!computed.has_value());
        assert_eq!(call_count.get(), 0);

        // First access triggers computation
        assert_eq!(computed.get(), 42);
        assert_eq!(call_count.get(), 1);
        assert!(computed.has_value());
    }

    #[test]
    fn computed_caches_value_when_clean() {
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let computed = Computed::new(move || {
            call_count_clone.set(call_count_clone.get() + 1);
            42
        });

        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(call_count.get(), 1);
    }

    #[test]
    fn computed_does_not_rerun_until_read() {
        let source = Ref::new(1);
        let call_count = Rc::new(Cell::new(0));

        let source_clone = source.clone();
        let call_count_clone = call_count.clone();
        let computed = Computed::new(move || {
            call_count_clone.set(call_count_clone.get() + 1);
            source_clone.get() * 10
        });

        assert_eq!(computed.get(), 10);
        assert!(!computed.is_dirty());

        source.set(2);
        source.set(3);
        assert!(computed.is_dirty());
        assert_eq!(call_count.get(), 1);

        assert_eq!(computed.get(), 30);
        assert_eq!(call_count.get(), 2);
    }

    #[test]
    fn effect_reacts_through_computed() {
        let source = Ref::new(1);
        let source_clone = source.clone();
        let doubled = Computed::new(move || source_clone.get() * 2);

        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let doubled_clone = doubled.clone();
        let effect = Effect::new(move || seen_clone.set(doubled_clone.get()));

        assert_eq!(seen.get(), 2);
        assert!(effect.dependency_count() >= 1);

        source.set(4);
        assert_eq!(seen.get(), 8);
    }

    #[test]
    fn computed_depends_on_computed() {
        let base = Ref::new(5);

        let base_clone = base.clone();
        let doubled = Computed::new(move || base_clone.get() * 2);

        let doubled_clone = doubled.clone();
        let plus_ten = Computed::new(move || doubled_clone.get() + 10);

        assert_eq!(plus_ten.get(), 20);

        base.set(10);
        assert!(doubled.is_dirty());
        assert!(plus_ten.is_dirty());
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn setter_is_forwarded() {
        let source = Ref::new(1);
        let source_get = source.clone();
        let source_set = source.clone();
        let plus_one = Computed::with_setter(
            move || source_get.get() + 1,
            move |value: i32| source_set.set(value - 1),
        );

        plus_one.set(10);
        assert_eq!(source.get(), 9);
        assert_eq!(plus_one.get(), 10);
    }

    #[test]
    fn write_without_setter_is_ignored() {
        let computed = Computed::new(|| 1);
        computed.set(5);
        assert_eq!(computed.get(), 1);
    }

    #[test]
    fn stopped_computed_keeps_cache() {
        let source = Ref::new(1);
        let source_clone = source.clone();
        let computed = computed(move || source_clone.get());

        assert_eq!(computed.get(), 1);
        computed.stop();

        source.set(2);
        assert!(!computed.is_dirty());
        assert_eq!(computed.get(), 1);
    }
}
