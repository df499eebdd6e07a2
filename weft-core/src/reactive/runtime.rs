//! Reactive Runtime
//!
//! The runtime owns the dependency registry: for every observed target, a map
//! from key to the set of effects that read that key. It is the only shared
//! mutable state in the engine, and it is only ever changed through
//! [`Runtime::track`], [`Runtime::trigger`], effect cleanup and target
//! eviction.
//!
//! # How It Works
//!
//! 1. While an effect runs, every reactive read calls `track(target, key)`,
//!    which adds the effect to the key's dependency set and links the set back
//!    to the effect.
//!
//! 2. Every reactive write calls `trigger(target, op, key)`, which collects
//!    the affected effects, computed ones first, and schedules them.
//!
//! 3. Before an effect reruns, it detaches from every set it joined, so each
//!    run records exactly the dependencies it read.
//!
//! # Ownership
//!
//! The registry is keyed by [`TargetId`] and never owns a target. Raw
//! containers and refs call [`Runtime::evict`] when they are dropped. Sets own
//! their subscribers; each effect only holds weak links back to its sets.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::effect::DebuggerEvent;
use super::subscriber::{EffectId, Subscriber};
use super::target::{Key, Target, TargetId, TriggerOp};

/// Weak links from an effect to the dependency sets it belongs to.
pub(crate) type Links = SmallVec<[Weak<Dep>; 4]>;

type KeyMap = IndexMap<Key, Rc<Dep>>;

thread_local! {
    static TARGETS: RefCell<HashMap<TargetId, KeyMap>> = RefCell::new(HashMap::new());
}

/// The set of effects depending on one `(target, key)` pair.
#[derive(Default)]
pub(crate) struct Dep {
    subscribers: RefCell<IndexMap<EffectId, Rc<dyn Subscriber>>>,
}

impl Dep {
    /// Add a subscriber. Returns false if it was already present.
    fn insert(&self, effect: &Rc<dyn Subscriber>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.contains_key(&effect.id()) {
            return false;
        }
        subscribers.insert(effect.id(), Rc::clone(effect));
        true
    }

    fn remove(&self, id: EffectId) -> Option<Rc<dyn Subscriber>> {
        self.subscribers.borrow_mut().shift_remove(&id)
    }

    fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// Link `dep` into the effect's own list if it is not there yet.
fn attach(effect: &Rc<dyn Subscriber>, dep: &Rc<Dep>) {
    let link = Rc::downgrade(dep);
    let mut links = effect.links().borrow_mut();
    if !links.iter().any(|existing| Weak::ptr_eq(existing, &link)) {
        links.push(link);
    }
}

/// The reactive runtime.
///
/// All state lives in thread-local storage; this type only groups the entry
/// points.
pub struct Runtime;

impl Runtime {
    /// Record that the active effect depends on `key` of `target`.
    ///
    /// No-op when no effect is running or tracking is paused.
    pub fn track(target: &(impl Target + ?Sized), key: Key) {
        let Some(effect) = ReactiveContext::tracking_effect() else {
            return;
        };
        let target_id = target.target_id();

        let dep = TARGETS.with(|targets| {
            let mut targets = targets.borrow_mut();
            Rc::clone(
                targets
                    .entry(target_id)
                    .or_default()
                    .entry(key.clone())
                    .or_default(),
            )
        });

        if dep.insert(&effect) {
            attach(&effect, &dep);
            tracing::trace!(effect = %effect.id(), %target_id, %key, "tracked");
            effect.on_track(&DebuggerEvent {
                effect: effect.id(),
                target: target_id,
                key,
                op: None,
            });
        }
    }

    /// Schedule every effect that depends on the mutated part of `target`.
    pub fn trigger(target: &(impl Target + ?Sized), op: TriggerOp, key: Key) {
        let target_id = target.target_id();
        let iteration_key = target.iteration_key();
        let active = ReactiveContext::active_effect_id();

        let Some((computed, plain)) = TARGETS.with(|targets| {
            let targets = targets.borrow();
            let keys = targets.get(&target_id)?;

            let mut computed: IndexMap<EffectId, Rc<dyn Subscriber>> = IndexMap::new();
            let mut plain: IndexMap<EffectId, Rc<dyn Subscriber>> = IndexMap::new();
            let mut collect = |dep: &Rc<Dep>| {
                for (id, effect) in dep.subscribers.borrow().iter() {
                    if Some(*id) == active {
                        continue;
                    }
                    let bucket = if effect.is_computed() {
                        &mut computed
                    } else {
                        &mut plain
                    };
                    bucket.entry(*id).or_insert_with(|| Rc::clone(effect));
                }
            };

            match op {
                TriggerOp::Clear => keys.values().for_each(&mut collect),
                TriggerOp::Set => {
                    if let Some(dep) = keys.get(&key) {
                        collect(dep);
                    }
                }
                TriggerOp::Add | TriggerOp::Delete => {
                    if let Some(dep) = keys.get(&key) {
                        collect(dep);
                    }
                    if let Some(dep) = keys.get(&iteration_key) {
                        collect(dep);
                    }
                }
            }

            Some((computed, plain))
        }) else {
            return;
        };

        tracing::trace!(
            %target_id,
            %op,
            %key,
            computed = computed.len(),
            plain = plain.len(),
            "triggered"
        );

        for effect in computed.into_values().chain(plain.into_values()) {
            // An earlier rerun in this fan-out may have stopped it.
            if !effect.is_active() {
                continue;
            }
            effect.on_trigger(&DebuggerEvent {
                effect: effect.id(),
                target: target_id,
                key: key.clone(),
                op: Some(op),
            });
            effect.schedule_run();
        }
    }

    /// Detach `effect` from every dependency set it joined.
    pub(crate) fn cleanup(effect: &dyn Subscriber) {
        let links = std::mem::take(&mut *effect.links().borrow_mut());
        for link in links {
            if let Some(dep) = link.upgrade() {
                let removed = dep.remove(effect.id());
                drop(removed);
            }
        }
    }

    /// Merge `child`'s dependency sets into the active effect.
    ///
    /// Used by computed refs so that an outer effect reacts to the computed's
    /// underlying dependencies, not only to its dirty flag.
    pub(crate) fn adopt(child: &dyn Subscriber) {
        let Some(parent) = ReactiveContext::tracking_effect() else {
            return;
        };
        if parent.id() == child.id() {
            return;
        }

        let deps: Vec<Rc<Dep>> = child
            .links()
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        for dep in deps {
            if dep.insert(&parent) {
                attach(&parent, &dep);
            }
        }
    }

    /// Forget every dependency set recorded for a dropped target.
    pub(crate) fn evict(target_id: TargetId) {
        // Thread-local storage may already be gone during thread teardown.
        let removed = TARGETS
            .try_with(|targets| {
                targets
                    .try_borrow_mut()
                    .ok()
                    .and_then(|mut targets| targets.remove(&target_id))
            })
            .ok()
            .flatten();

        if let Some(keys) = removed {
            tracing::debug!(%target_id, keys = keys.len(), "evicted target");
            drop(keys);
        }
    }

    /// Number of effects currently depending on `key` of `target`.
    pub fn subscriber_count(target: &(impl Target + ?Sized), key: &Key) -> usize {
        let target_id = target.target_id();
        TARGETS.with(|targets| {
            targets
                .borrow()
                .get(&target_id)
                .and_then(|keys| keys.get(key))
                .map_or(0, |dep| dep.len())
        })
    }

    /// Check whether the registry holds any entry for `target`.
    pub fn is_registered(target: &(impl Target + ?Sized)) -> bool {
        let target_id = target.target_id();
        TARGETS.with(|targets| targets.borrow().contains_key(&target_id))
    }

    /// Check if an effect is currently executing.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_tracking()
    }
}

/// Record that the active effect depends on `key` of `target`.
pub fn track(target: &(impl Target + ?Sized), key: Key) {
    Runtime::track(target, key);
}

/// Notify every effect that depends on `key` of `target`.
pub fn trigger(target: &(impl Target + ?Sized), op: TriggerOp, key: Key) {
    Runtime::trigger(target, op, key);
}
