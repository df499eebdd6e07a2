//! Reactive Primitives
//!
//! This module implements the core reactive system: effects, refs, and
//! computed refs, on top of a dependency registry keyed by target and key.
//!
//! # Concepts
//!
//! ## Effects
//!
//! An Effect is a computation that records every reactive read it performs
//! and reruns when any of them changes. A rerun is either synchronous or
//! handed to a host scheduler as a [`Job`].
//!
//! ## Refs
//!
//! A Ref is a single boxed reactive value. Reading it inside an effect makes
//! the effect depend on it; writing it reruns the dependents.
//!
//! ## Computed
//!
//! A Computed is a derived value that caches its result and recomputes only
//! when read after one of its dependencies changed.
//!
//! ## Targets and Keys
//!
//! The registry is addressed by `(target, key)`. Refs, raw containers and
//! proxies are targets; hosts can implement [`Target`] for their own types or
//! use a bare [`TargetId`] with the free [`track`] and [`trigger`] functions.
//!
//! # Implementation Notes
//!
//! All state is thread-local. The currently running effect is the top of a
//! per-thread stack maintained by [`ReactiveContext`]; reads consult it to
//! decide what to record.

mod computed;
mod context;
mod effect;
mod refs;
mod runtime;
mod subscriber;
mod target;

pub use computed::{computed, Computed};
pub use context::{enable_tracking, pause_tracking, reset_tracking, untracked, ReactiveContext};
pub use effect::{watch, DebuggerEvent, Effect, EffectOptions};
pub use refs::{Ref, RefLike, ToReactive};
pub use runtime::{track, trigger, Runtime};
pub use subscriber::{EffectId, Job, Scheduler};
pub use target::{Key, Target, TargetId, TriggerOp};
