//! Integration Tests for Reactive System
//!
//! These tests verify that effects, refs, computed refs and proxies work
//! together correctly through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;

use weft_core::observe::{self, reactive, readonly, Array, Map, Object, Value};
use weft_core::reactive::{
    computed, untracked, watch, Computed, Effect, EffectOptions, Key, ReactiveContext, Ref,
    Runtime, TargetId, TriggerOp,
};
use weft_core::scheduler::JobQueue;
use weft_core::Error;

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    (calls.clone(), calls)
}

/// Test that an effect reading a ref twice reruns once per write.
#[test]
fn ref_effect_runs_once_per_write() {
    let count = Ref::new(0);
    let (calls, calls_clone) = counter();

    let count_clone = count.clone();
    let _effect = watch(move || {
        calls_clone.set(calls_clone.get() + 1);
        count_clone.get();
        count_clone.get();
    });

    count.set(1);
    assert_eq!(calls.get(), 2);
}

/// Test that writing the same value into a map entry does not rerun.
#[test]
fn map_identical_write_does_not_rerun() {
    let map = reactive(&Value::from(Map::new())).unwrap();
    let map = map.as_map().unwrap().clone();
    let (calls, calls_clone) = counter();

    let reader = map.clone();
    let _effect = Effect::new(move || {
        calls_clone.set(calls_clone.get() + 1);
        reader.get("a");
    });

    map.set("a", "x").unwrap();
    assert_eq!(calls.get(), 2);

    map.set("a", "x").unwrap();
    assert_eq!(calls.get(), 2);
}

/// Test that pushing to an array reruns an effect reading its length.
#[test]
fn array_push_reruns_length_reader() {
    let list = Array::new().reactive();
    let lengths = Rc::new(RefCell::new(Vec::new()));

    let reader = list.clone();
    let lengths_clone = lengths.clone();
    let _effect = Effect::new(move || lengths_clone.borrow_mut().push(reader.len()));

    list.push(1).unwrap();
    list.push(2).unwrap();
    assert_eq!(*lengths.borrow(), vec![0, 1, 2]);
}

/// Test that wrapping the same object twice yields the same proxy.
#[test]
fn reactive_is_identity_stable() {
    let raw = Value::from(Object::new());
    let first = reactive(&raw).unwrap();
    let second = reactive(&raw).unwrap();
    assert_eq!(first, second);

    // Wrapping the proxy itself is a no-op
    let again = reactive(&Value::from(first.clone())).unwrap();
    assert_eq!(again, first);
}

/// Test that a read-only view of a reactive proxy rejects writes while the
/// reactive proxy keeps rerunning dependents.
#[test]
fn readonly_of_reactive_rejects_writes() {
    let raw = Value::from_json(json!({ "n": 1 }));
    let state = reactive(&raw).unwrap();
    let view = readonly(&Value::from(state.clone())).unwrap();
    assert!(view.is_readonly());

    let (calls, calls_clone) = counter();
    let reader = view.as_object().unwrap().clone();
    let _effect = Effect::new(move || {
        calls_clone.set(calls_clone.get() + 1);
        reader.get("n");
    });

    let err = view.as_object().unwrap().set("n", 2).unwrap_err();
    assert!(matches!(err, Error::Readonly { op: TriggerOp::Set, .. }));
    assert_eq!(err.to_string(), "cannot set key `n`: target is readonly");
    assert_eq!(calls.get(), 1);

    state.as_object().unwrap().set("n", 2).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(view.as_object().unwrap().get("n"), Some(Value::from(2)));
}

/// Test that nested reads through a read-only proxy stay read-only.
#[test]
fn readonly_is_deep() {
    let raw = Value::from_json(json!({ "a": { "b": [1, 2] } }));
    let view = readonly(&raw).unwrap();

    let a = view.as_object().unwrap().get("a").unwrap();
    assert!(observe::is_readonly(&a));

    let b = a.as_object().unwrap().get("b").unwrap();
    assert!(observe::is_readonly(&b));
    assert!(b.as_array().unwrap().push(3).is_err());
    assert_eq!(raw.to_json().unwrap(), json!({ "a": { "b": [1, 2] } }));
}

/// Test that a computed does not rerun its getter until it is read.
#[test]
fn computed_is_lazy_until_read() {
    let source = Ref::new(1);
    let (calls, calls_clone) = counter();

    let source_clone = source.clone();
    let doubled: Computed<i32> = computed(move || {
        calls_clone.set(calls_clone.get() + 1);
        source_clone.get() * 2
    });
    assert_eq!(calls.get(), 0);

    assert_eq!(doubled.get(), 2);
    source.set(2);
    source.set(3);
    assert_eq!(calls.get(), 1);

    assert_eq!(doubled.get(), 6);
    assert_eq!(calls.get(), 2);
}

/// Test that computed effects are invalidated before plain effects run.
#[test]
fn plain_effects_see_fresh_computed_values() {
    let source = Ref::new(1);
    let source_clone = source.clone();
    let doubled = Computed::new(move || source_clone.get() * 2);

    let observed = Rc::new(RefCell::new(Vec::new()));
    let observed_clone = observed.clone();
    let source_clone = source.clone();
    let doubled_clone = doubled.clone();
    let _effect = Effect::new(move || {
        let pair = (source_clone.get(), doubled_clone.get());
        observed_clone.borrow_mut().push(pair);
    });

    source.set(2);
    assert_eq!(*observed.borrow(), vec![(1, 2), (2, 4)]);
}

/// Test that a stopped effect is never invoked again, even with a queued job.
#[test]
fn stopped_effect_never_reruns() {
    let queue = JobQueue::new();
    let source = Ref::new(0);
    let (calls, calls_clone) = counter();

    let source_clone = source.clone();
    let effect = Effect::with_options(
        move || {
            calls_clone.set(calls_clone.get() + 1);
            source_clone.get();
        },
        EffectOptions::new().scheduler(queue.scheduler()),
    );

    source.set(1);
    effect.stop();
    effect.stop();
    source.set(2);
    queue.flush();

    assert_eq!(calls.get(), 1);
    assert_eq!(source.subscriber_count(), 0);
    assert!(!effect.is_active());
}

/// Test that an effect writing to its own dependency does not loop.
#[test]
fn self_triggering_effect_does_not_recurse() {
    let count = Ref::new(0);
    let count_clone = count.clone();
    let effect = Effect::new(move || {
        let next = count_clone.get() + 1;
        count_clone.set(next);
    });

    assert_eq!(count.get_untracked(), 1);
    assert_eq!(effect.run_count(), 1);

    count.set(10);
    assert_eq!(count.get_untracked(), 11);
    assert_eq!(effect.run_count(), 2);
}

/// Test that dependencies are re-collected on every run.
#[test]
fn branch_switch_drops_stale_dependencies() {
    let flag = Ref::new(true);
    let left = Ref::new("left");
    let right = Ref::new("right");
    let (calls, calls_clone) = counter();

    let (flag_clone, left_clone, right_clone) = (flag.clone(), left.clone(), right.clone());
    let _effect = Effect::new(move || {
        calls_clone.set(calls_clone.get() + 1);
        if flag_clone.get() {
            left_clone.get();
        } else {
            right_clone.get();
        }
    });

    flag.set(false);
    assert_eq!(calls.get(), 2);

    left.set("ignored");
    assert_eq!(calls.get(), 2);

    right.set("seen");
    assert_eq!(calls.get(), 3);
}

/// Test that nested effects restore the outer effect as active.
#[test]
fn nested_effects_track_their_own_reads() {
    let outer_source = Ref::new(0);
    let inner_source = Ref::new(0);
    let (outer_calls, outer_clone) = counter();
    let (inner_calls, inner_clone) = counter();
    let inner_effects = Rc::new(RefCell::new(Vec::new()));

    let (outer_src, inner_src, effects) = (
        outer_source.clone(),
        inner_source.clone(),
        inner_effects.clone(),
    );
    let _outer = Effect::new(move || {
        outer_clone.set(outer_clone.get() + 1);
        let inner_src = inner_src.clone();
        let inner_clone = inner_clone.clone();
        effects.borrow_mut().push(Effect::new(move || {
            inner_clone.set(inner_clone.get() + 1);
            inner_src.get();
        }));
        assert_eq!(ReactiveContext::depth(), 1);
        outer_src.get();
    });

    inner_source.set(1);
    assert_eq!(outer_calls.get(), 1);
    assert_eq!(inner_calls.get(), 2);

    outer_source.set(1);
    assert_eq!(outer_calls.get(), 2);
    assert!(!ReactiveContext::is_active());
}

/// Test that untracked reads do not subscribe.
#[test]
fn untracked_reads_do_not_subscribe() {
    let source = Ref::new(0);
    let (calls, calls_clone) = counter();

    let source_clone = source.clone();
    let _effect = Effect::new(move || {
        calls_clone.set(calls_clone.get() + 1);
        untracked(|| source_clone.get());
    });

    source.set(1);
    assert_eq!(calls.get(), 1);
}

/// Test that running a stopped effect from another effect subscribes neither.
#[test]
fn stopped_effect_reads_do_not_leak_into_caller() {
    let state = Object::new().reactive();
    state.set("n", 0).unwrap();

    let reader = state.clone();
    let stopped = Effect::new(move || {
        reader.get("n");
    });
    stopped.stop();

    let (calls, calls_clone) = counter();
    let stopped_clone = stopped.clone();
    let _outer = Effect::new(move || {
        calls_clone.set(calls_clone.get() + 1);
        stopped_clone.run();
    });

    state.set("n", 1).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(!ReactiveContext::is_active());
}

/// Test that hosts can drive the registry with their own targets.
#[test]
fn manual_track_and_trigger() {
    let target = TargetId::new();
    let (calls, calls_clone) = counter();

    let _effect = Effect::new(move || {
        calls_clone.set(calls_clone.get() + 1);
        Runtime::track(&target, Key::prop("x"));
    });

    Runtime::trigger(&target, TriggerOp::Set, Key::prop("x"));
    Runtime::trigger(&target, TriggerOp::Clear, Key::Iterate);
    assert_eq!(calls.get(), 3);
    assert_eq!(Runtime::subscriber_count(&target, &Key::prop("x")), 1);
}

/// Test that refs nested in reactive objects are unwrapped on read and
/// written through on assignment.
#[test]
fn refs_inside_reactive_objects() {
    let count = Ref::new(Value::from(1));
    let raw = Object::new();
    raw.insert("count", Value::from(count.clone()));
    let state = raw.reactive();

    assert_eq!(state.get("count"), Some(Value::from(1)));
    state.set("count", 2).unwrap();
    assert_eq!(count.get(), Value::from(2));

    // Replacing the ref with another ref swaps it
    let other = Ref::new(Value::from(9));
    state.set("count", Value::from(other)).unwrap();
    assert_eq!(state.get("count"), Some(Value::from(9)));
    assert_eq!(count.get(), Value::from(2));
}

/// Test that a ref holding a container wraps it reactively.
#[test]
fn ref_wraps_container_values() {
    let state = Ref::new(Value::from_json(json!({ "items": [] })));
    let (calls, calls_clone) = counter();

    let state_clone = state.clone();
    let _effect = Effect::new(move || {
        calls_clone.set(calls_clone.get() + 1);
        let value = state_clone.get();
        let items = value.as_object().unwrap().get("items").unwrap();
        items.as_array().unwrap().len();
    });

    let value = state.get();
    let items = value.as_object().unwrap().get("items").unwrap();
    items.as_array().unwrap().push("new").unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(
        state.get().to_json().unwrap(),
        json!({ "items": ["new"] })
    );
}

/// Test that debug hooks observe tracking, triggering and stopping.
#[test]
fn debug_hooks_fire() {
    let source = Ref::new(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let (on_track, on_trigger, on_stop) = (log.clone(), log.clone(), log.clone());
    let source_clone = source.clone();
    let effect = Effect::with_options(
        move || {
            source_clone.get();
        },
        EffectOptions::new()
            .on_track(move |event| on_track.borrow_mut().push(format!("track {}", event.key)))
            .on_trigger(move |event| {
                on_trigger
                    .borrow_mut()
                    .push(format!("trigger {} {}", event.op.unwrap(), event.key))
            })
            .on_stop(move || on_stop.borrow_mut().push("stop".to_string())),
    );

    source.set(1);
    effect.stop();
    assert_eq!(
        *log.borrow(),
        vec!["track value", "trigger set value", "track value", "stop"]
    );
}

/// Test that map iteration and sets follow JavaScript insertion order.
#[test]
fn collections_preserve_insertion_order() {
    let map = Map::new().reactive();
    map.set("z", 1).unwrap();
    map.set("a", 2).unwrap();
    map.set("z", 3).unwrap();

    let keys: Vec<_> = map
        .keys()
        .iter()
        .filter_map(|k| k.as_str().map(str::to_owned))
        .collect();
    assert_eq!(keys, vec!["z", "a"]);
    assert_eq!(
        Value::from(map.to_raw()).to_json().unwrap(),
        json!([["z", 3], ["a", 2]])
    );
}
