//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: plain
//! effects and the internal effects behind computed refs. The runtime stores
//! them type-erased behind the [`Subscriber`] trait so that dependency sets can
//! hold effects of any return type.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::DebuggerEvent;
use super::runtime::Links;

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// Type-erased view of an effect, as seen by the runtime.
pub(crate) trait Subscriber {
    fn id(&self) -> EffectId;

    /// Computed effects are scheduled before plain ones on every trigger.
    fn is_computed(&self) -> bool;

    fn is_active(&self) -> bool;

    /// The dependency sets this subscriber currently belongs to.
    fn links(&self) -> &RefCell<Links>;

    /// Hand the rerun to the scheduler, or run synchronously without one.
    fn schedule_run(self: Rc<Self>);

    /// Run now, discarding the result.
    fn run_now(self: Rc<Self>);

    fn on_track(&self, event: &DebuggerEvent);

    fn on_trigger(&self, event: &DebuggerEvent);
}

/// A pending rerun handed to a [`Scheduler`].
///
/// Calling [`run`](Job::run) executes the effect with full dependency
/// tracking. Jobs belonging to an effect that has since been stopped do
/// nothing.
#[derive(Clone)]
pub struct Job {
    effect: Rc<dyn Subscriber>,
}

impl Job {
    pub(crate) fn new(effect: Rc<dyn Subscriber>) -> Self {
        Self { effect }
    }

    /// The effect this job reruns. Hosts use it to coalesce duplicates.
    pub fn id(&self) -> EffectId {
        self.effect.id()
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    pub fn run(&self) {
        if self.effect.is_active() {
            Rc::clone(&self.effect).run_now();
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("effect", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Host callback deciding when a scheduled rerun actually executes.
pub type Scheduler = Rc<dyn Fn(Job)>;
