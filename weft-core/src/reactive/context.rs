//! Reactive Context
//!
//! The reactive context tracks which effect is currently running and whether
//! reads should be recorded at all. This enables automatic dependency
//! tracking: when a reactive value is read, the runtime registers the current
//! effect as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing effect. When
//! an effect runs we push it onto the stack; when it completes (or panics) the
//! [`ReactiveContext`] guard pops it. Nested effects and computed refs read
//! from inside effects therefore always see the innermost effect on top.
//!
//! Whether reads are recorded is a second stack of booleans rather than a
//! single flag, so nested suspended regions restore exactly the state they
//! found on exit.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{EffectId, Subscriber};

thread_local! {
    static CONTEXT_STACK: RefCell<ContextState> = RefCell::new(ContextState::default());
}

struct ContextState {
    /// Currently executing effects, innermost last.
    effects: Vec<Rc<dyn Subscriber>>,
    should_track: bool,
    /// Saved `should_track` values, one per pause/enable/enter.
    track_stack: Vec<bool>,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
            should_track: true,
            track_stack: Vec::new(),
        }
    }
}

/// Guard that pops the active effect when dropped.
///
/// This ensures the context stack is properly maintained even if the effect
/// function panics.
pub struct ReactiveContext {
    effect_id: EffectId,
}

impl ReactiveContext {
    /// Make `effect` the active effect and resume tracking until the returned
    /// guard is dropped.
    pub(crate) fn enter(effect: Rc<dyn Subscriber>) -> Self {
        let effect_id = effect.id();
        CONTEXT_STACK.with(|stack| {
            let mut state = stack.borrow_mut();
            state.effects.push(effect);
            let previous = state.should_track;
            state.track_stack.push(previous);
            state.should_track = true;
        });

        Self { effect_id }
    }

    /// Check if any effect is executing.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().effects.is_empty())
    }

    /// Check if a read right now would be recorded.
    pub fn is_tracking() -> bool {
        CONTEXT_STACK.with(|stack| {
            let state = stack.borrow();
            state.should_track && !state.effects.is_empty()
        })
    }

    /// The ID of the innermost executing effect, if any.
    pub fn active_effect_id() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| stack.borrow().effects.last().map(|effect| effect.id()))
    }

    /// Number of nested effects currently executing.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().effects.len())
    }

    /// Check if the given effect is anywhere on the stack.
    pub fn is_running(effect_id: EffectId) -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .effects
                .iter()
                .any(|effect| effect.id() == effect_id)
        })
    }

    /// The effect reads should be recorded against, if tracking is enabled.
    pub(crate) fn tracking_effect() -> Option<Rc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| {
            let state = stack.borrow();
            if state.should_track {
                state.effects.last().cloned()
            } else {
                None
            }
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| {
            let mut state = stack.borrow_mut();
            let popped = state.effects.pop();
            state.should_track = state.track_stack.pop().unwrap_or(true);
            popped
        });

        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.effect_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.effect_id,
                effect.id()
            );
        }
    }
}

/// Stop recording reads until the matching [`reset_tracking`].
pub fn pause_tracking() {
    CONTEXT_STACK.with(|stack| {
        let mut state = stack.borrow_mut();
        let previous = state.should_track;
        state.track_stack.push(previous);
        state.should_track = false;
    });
}

/// Record reads again until the matching [`reset_tracking`].
pub fn enable_tracking() {
    CONTEXT_STACK.with(|stack| {
        let mut state = stack.borrow_mut();
        let previous = state.should_track;
        state.track_stack.push(previous);
        state.should_track = true;
    });
}

/// Restore the tracking state saved by the last pause/enable.
pub fn reset_tracking() {
    CONTEXT_STACK.with(|stack| {
        let mut state = stack.borrow_mut();
        state.should_track = state.track_stack.pop().unwrap_or(true);
    });
}

/// Run `f` without recording any reads it performs.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    struct Reset;

    impl Drop for Reset {
        fn drop(&mut self) {
            reset_tracking();
        }
    }

    pause_tracking();
    let _reset = Reset;
    f()
}
