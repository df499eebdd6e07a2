//! Effect Implementation
//!
//! An Effect is a computation that records what it reads and reruns (or is
//! rescheduled) whenever one of those reads changes.
//!
//! # How Effects Work
//!
//! 1. Unless created lazily, the effect runs its function immediately to
//!    establish initial dependencies.
//!
//! 2. When any dependency changes, the runtime calls `schedule_run`, which
//!    hands a [`Job`] to the effect's scheduler or reruns synchronously.
//!
//! 3. Before rerunning, the effect detaches from every dependency set it
//!    joined and tracks new ones during execution, so conditional reads are
//!    handled correctly.
//!
//! # Re-entrancy
//!
//! An effect that is already executing is never run again from inside itself.
//! The nested call returns `None` instead, which is what stops an effect that
//! writes to its own dependencies from looping forever.
//!
//! # Stopping
//!
//! `stop` detaches the effect from every dependency set. A stopped effect is
//! never scheduled again, but calling `run` on it still executes the raw
//! function, untracked.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::context::{untracked, ReactiveContext};
use super::runtime::{Links, Runtime};
use super::subscriber::{EffectId, Job, Scheduler, Subscriber};
use super::target::{Key, TargetId, TriggerOp};

/// Passed to the `on_track` / `on_trigger` debug hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct DebuggerEvent {
    pub effect: EffectId,
    pub target: TargetId,
    pub key: Key,
    /// `None` for track events.
    pub op: Option<TriggerOp>,
}

type DebugHook = Rc<dyn Fn(&DebuggerEvent)>;

/// Configuration for an [`Effect`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    pub(crate) lazy: bool,
    pub(crate) computed: bool,
    pub(crate) scheduler: Option<Scheduler>,
    pub(crate) on_track: Option<DebugHook>,
    pub(crate) on_trigger: Option<DebugHook>,
    pub(crate) on_stop: Option<Rc<dyn Fn()>>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run on creation.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Mark as the effect behind a computed value, scheduled ahead of plain
    /// effects on every trigger.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Decide when scheduled reruns execute.
    pub fn scheduler(mut self, scheduler: impl Fn(Job) + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn on_track(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_track = Some(Rc::new(hook));
        self
    }

    pub fn on_trigger(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_trigger = Some(Rc::new(hook));
        self
    }

    pub fn on_stop(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_stop = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("computed", &self.computed)
            .field("scheduler", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

struct EffectInner<R> {
    id: EffectId,
    run: Box<dyn Fn() -> R>,
    links: RefCell<Links>,
    active: Cell<bool>,
    run_count: Cell<usize>,
    options: EffectOptions,
}

fn run_effect<R: 'static>(inner: &Rc<EffectInner<R>>) -> Option<R> {
    if !inner.active.get() {
        return Some(untracked(|| (inner.run)()));
    }
    if ReactiveContext::is_running(inner.id) {
        tracing::trace!(effect = %inner.id, "skipped re-entrant run");
        return None;
    }

    Runtime::cleanup(&**inner);
    let _ctx = ReactiveContext::enter(Rc::clone(inner) as Rc<dyn Subscriber>);
    inner.run_count.set(inner.run_count.get() + 1);
    tracing::trace!(effect = %inner.id, "running");
    Some((inner.run)())
}

impl<R: 'static> Subscriber for EffectInner<R> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn is_computed(&self) -> bool {
        self.options.computed
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn links(&self) -> &RefCell<Links> {
        &self.links
    }

    fn schedule_run(self: Rc<Self>) {
        match &self.options.scheduler {
            Some(scheduler) => scheduler(Job::new(Rc::clone(&self) as Rc<dyn Subscriber>)),
            None => {
                run_effect(&self);
            }
        }
    }

    fn run_now(self: Rc<Self>) {
        run_effect(&self);
    }

    fn on_track(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_track {
            hook(event);
        }
    }

    fn on_trigger(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_trigger {
            hook(event);
        }
    }
}

/// A reactive computation that reruns when the values it read change.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::{Effect, Ref};
///
/// let count = Ref::new(0);
/// let seen = Ref::new(-1);
///
/// let count_clone = count.clone();
/// let seen_clone = seen.clone();
/// let _effect = Effect::new(move || seen_clone.set(count_clone.get()));
///
/// count.set(5);
/// assert_eq!(seen.get_untracked(), 5);
/// ```
pub struct Effect<R: 'static = ()> {
    inner: Rc<EffectInner<R>>,
}

impl<R: 'static> Effect<R> {
    /// Create an effect that runs now and on every future dependency change.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() -> R + 'static,
    {
        Self::with_options(run, EffectOptions::default())
    }

    /// Create an effect without running it.
    ///
    /// No dependencies are recorded until the first [`run`](Self::run).
    pub fn lazy<F>(run: F) -> Self
    where
        F: Fn() -> R + 'static,
    {
        Self::with_options(run, EffectOptions::new().lazy())
    }

    pub fn with_options<F>(run: F, options: EffectOptions) -> Self
    where
        F: Fn() -> R + 'static,
    {
        let lazy = options.lazy;
        let effect = Self {
            inner: Rc::new(EffectInner {
                id: EffectId::new(),
                run: Box::new(run),
                links: RefCell::new(Links::new()),
                active: Cell::new(true),
                run_count: Cell::new(0),
                options,
            }),
        };

        if !lazy {
            effect.run();
        }

        effect
    }

    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Execute the effect, tracking everything it reads.
    ///
    /// Returns `None` when the effect is already executing further up the
    /// stack.
    pub fn run(&self) -> Option<R> {
        run_effect(&self.inner)
    }

    /// Rerun through the scheduler, or synchronously without one.
    pub fn schedule_run(&self) {
        Rc::clone(&self.inner).schedule_run();
    }

    /// Detach from every dependency. Calling it again does nothing.
    pub fn stop(&self) {
        if !self.inner.active.get() {
            return;
        }
        Runtime::cleanup(&*self.inner);
        if let Some(on_stop) = &self.inner.options.on_stop {
            on_stop();
        }
        self.inner.active.set(false);
        tracing::debug!(effect = %self.inner.id, "stopped");
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn is_computed(&self) -> bool {
        self.inner.options.computed
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of dependency sets the effect currently belongs to.
    pub fn dependency_count(&self) -> usize {
        self.inner.links.borrow().len()
    }

    pub(crate) fn subscriber(&self) -> &dyn Subscriber {
        &*self.inner
    }
}

impl<R: 'static> Clone for Effect<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: 'static> PartialEq for Effect<R> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R: 'static> fmt::Debug for Effect<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Run `f` now and again on every future dependency change.
pub fn watch<F>(f: F) -> Effect
where
    F: Fn() + 'static,
{
    Effect::new(f)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
