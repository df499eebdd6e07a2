//! Object and array proxies.
//!
//! Reads track the key they touch and wrap nested containers in the proxy's
//! mode. Writes store raw values, then trigger: `Add` for a new key, `Set`
//! for a changed one, `Delete` for a removed one. Array mutators are
//! expressed as the index writes they perform, so shifting elements triggers
//! `Set` on every index whose value changed.
//!
//! Data borrows are always released before triggering; effects woken by a
//! write are free to read the same container.

use std::rc::Rc;

use super::proxy::{ArrayProxy, ObjectProxy};
use super::value::{has_changed, Value};
use crate::error::Result;
use crate::reactive::{Key, TriggerOp};

impl ObjectProxy {
    /// Read a field.
    ///
    /// A ref stored in the field is unwrapped: the ref's own key is tracked
    /// instead of the field's.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = self.raw().data().0.get(key).cloned();
        if let Some(Value::Ref(r)) = &value {
            return Some(self.wrap(r.get()));
        }
        self.track(Key::prop(key));
        value.map(|value| self.wrap(value))
    }

    /// Write a field.
    ///
    /// Writing a non-ref over a ref assigns through the ref instead of
    /// replacing it.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.check_writable(TriggerOp::Set, || Key::prop(key))?;
        let value = value.into().into_raw();
        let old = self.raw().data().0.get(key).cloned();

        if let Some(Value::Ref(r)) = &old {
            if !matches!(value, Value::Ref(_)) {
                r.set(value);
                return Ok(());
            }
        }

        let previous = self
            .raw()
            .data_mut()
            .0
            .insert(Rc::from(key), value.clone());
        drop(previous);

        match old {
            None => self.trigger(TriggerOp::Add, Key::prop(key)),
            Some(old) if has_changed(&old, &value) => self.trigger(TriggerOp::Set, Key::prop(key)),
            Some(_) => {}
        }
        Ok(())
    }

    /// Remove a field. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.check_writable(TriggerOp::Delete, || Key::prop(key))?;
        let removed = self.raw().data_mut().0.shift_remove(key);
        let existed = removed.is_some();
        drop(removed);

        if existed {
            self.trigger(TriggerOp::Delete, Key::prop(key));
        }
        Ok(existed)
    }

    pub fn has(&self, key: &str) -> bool {
        self.track(Key::prop(key));
        self.raw().data().0.contains_key(key)
    }

    /// Field names in insertion order. Tracks additions and removals.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.track(Key::Iterate);
        self.raw().data().0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.track(Key::Iterate);
        self.raw().data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every field with its value, read as [`get`](Self::get) would.
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.keys()
            .into_iter()
            .filter_map(|key| {
                let value = self.get(&key)?;
                Some((key, value))
            })
            .collect()
    }
}

impl ArrayProxy {
    /// Read an element. Refs are returned intact.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.track(Key::Index(index));
        let value = self.raw().data().0.get(index).cloned();
        value.map(|value| self.wrap(value))
    }

    pub fn has(&self, index: usize) -> bool {
        self.track(Key::Index(index));
        index < self.raw().data().0.len()
    }

    pub fn len(&self) -> usize {
        self.track(Key::Length);
        self.raw().data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write an element. Writing past the end fills the gap with nulls.
    ///
    /// # Panics
    ///
    /// Panics if growing the array to `index + 1` elements exceeds `isize::MAX`
    /// bytes, as [`Vec::resize`] does.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.check_writable(TriggerOp::Set, || Key::Index(index))?;
        let value = value.into().into_raw();
        let old = self.raw().data().0.get(index).cloned();

        if let Some(Value::Ref(r)) = &old {
            if !matches!(value, Value::Ref(_)) {
                r.set(value);
                return Ok(());
            }
        }

        let previous = {
            let mut items = self.raw().data_mut();
            if index < items.0.len() {
                Some(std::mem::replace(&mut items.0[index], value.clone()))
            } else {
                items.0.resize(index, Value::Null);
                items.0.push(value.clone());
                None
            }
        };
        drop(previous);

        match old {
            None => self.trigger(TriggerOp::Add, Key::Index(index)),
            Some(old) if has_changed(&old, &value) => {
                self.trigger(TriggerOp::Set, Key::Index(index))
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Append an element and return the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        self.check_writable(TriggerOp::Add, || Key::Length)?;
        let value = value.into().into_raw();
        let index = {
            let mut items = self.raw().data_mut();
            items.0.push(value);
            items.0.len() - 1
        };
        self.trigger(TriggerOp::Add, Key::Index(index));
        Ok(index + 1)
    }

    pub fn pop(&self) -> Result<Option<Value>> {
        self.check_writable(TriggerOp::Delete, || Key::Length)?;
        let (popped, len) = {
            let mut items = self.raw().data_mut();
            let popped = items.0.pop();
            (popped, items.0.len())
        };
        let Some(popped) = popped else {
            return Ok(None);
        };
        self.trigger(TriggerOp::Delete, Key::Index(len));
        Ok(Some(self.wrap(popped)))
    }

    /// Insert an element, shifting later elements up. An index past the end
    /// appends.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.check_writable(TriggerOp::Add, || Key::Index(index))?;
        let value = value.into().into_raw();
        let (index, tail) = {
            let mut items = self.raw().data_mut();
            let index = index.min(items.0.len());
            let tail: Vec<Value> = items.0[index..].to_vec();
            items.0.insert(index, value.clone());
            (index, tail)
        };

        self.trigger(TriggerOp::Add, Key::Index(index + tail.len()));
        for offset in (0..tail.len()).rev() {
            let now = if offset == 0 { &value } else { &tail[offset - 1] };
            if has_changed(&tail[offset], now) {
                self.trigger(TriggerOp::Set, Key::Index(index + offset));
            }
        }
        Ok(())
    }

    /// Remove the element at `index`, shifting later elements down.
    pub fn remove(&self, index: usize) -> Result<Option<Value>> {
        self.check_writable(TriggerOp::Delete, || Key::Index(index))?;
        let tail = {
            let mut items = self.raw().data_mut();
            if index >= items.0.len() {
                return Ok(None);
            }
            let tail: Vec<Value> = items.0[index..].to_vec();
            items.0.remove(index);
            tail
        };

        for offset in 0..tail.len() - 1 {
            if has_changed(&tail[offset], &tail[offset + 1]) {
                self.trigger(TriggerOp::Set, Key::Index(index + offset));
            }
        }
        self.trigger(TriggerOp::Delete, Key::Index(index + tail.len() - 1));

        let removed = tail.into_iter().next();
        Ok(removed.map(|value| self.wrap(value)))
    }

    /// Shorten the array to `len` elements.
    ///
    /// Triggers the length once, then every removed index.
    pub fn truncate(&self, len: usize) -> Result<()> {
        self.check_writable(TriggerOp::Set, || Key::Length)?;
        let removed = {
            let mut items = self.raw().data_mut();
            if len >= items.0.len() {
                return Ok(());
            }
            items.0.split_off(len)
        };

        self.trigger(TriggerOp::Set, Key::Length);
        for index in len..len + removed.len() {
            self.trigger(TriggerOp::Set, Key::Index(index));
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.truncate(0)
    }

    /// Snapshot of the elements, each read as [`get`](Self::get) would.
    pub fn to_vec(&self) -> Vec<Value> {
        let len = self.len();
        (0..len).filter_map(|index| self.get(index)).collect()
    }

    /// First index strictly equal to `needle`.
    pub fn index_of(&self, needle: impl Into<Value>) -> Option<usize> {
        self.search(&needle.into(), false, Value::strict_eq)
    }

    /// Last index strictly equal to `needle`.
    pub fn last_index_of(&self, needle: impl Into<Value>) -> Option<usize> {
        self.search(&needle.into(), true, Value::strict_eq)
    }

    /// Like [`index_of`](Self::index_of), but `NaN` finds `NaN`.
    pub fn includes(&self, needle: impl Into<Value>) -> bool {
        self.search(&needle.into(), false, |a, b| !has_changed(a, b))
            .is_some()
    }

    /// Compare the wrapped elements with `needle` as given, then the raw
    /// elements with the raw `needle`, so both a proxy and its target match.
    fn search(&self, needle: &Value, reverse: bool, eq: fn(&Value, &Value) -> bool) -> Option<usize> {
        let len = self.len();
        for index in 0..len {
            self.track(Key::Index(index));
        }
        let items: Vec<Value> = self.raw().data().0.clone();

        let find = |matches: &dyn Fn(&Value) -> bool| {
            if reverse {
                items.iter().rposition(matches)
            } else {
                items.iter().position(matches)
            }
        };

        find(&|item: &Value| eq(&self.wrap(item.clone()), needle)).or_else(|| {
            let raw = needle.to_raw();
            find(&|item: &Value| eq(item, &raw))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::observe::{Array, Object};
    use crate::reactive::{Effect, Ref};
    use serde_json::json;
    use std::cell::Cell;

    fn runs_of(f: impl Fn() + 'static) -> (Effect, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let effect = Effect::new(move || {
            runs_clone.set(runs_clone.get() + 1);
            f();
        });
        (effect, runs)
    }

    fn object(json: serde_json::Value) -> Object {
        match Value::from_json(json) {
            Value::Object(raw) => raw,
            other => panic!("expected object, got {other:?}"),
        }
    }

    fn array(json: serde_json::Value) -> Array {
        match Value::from_json(json) {
            Value::Array(raw) => raw,
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn object_set_reruns_reader() {
        let state = object(json!({ "a": 1 })).reactive();
        let reader = state.clone();
        let (_effect, runs) = runs_of(move || {
            reader.get("a");
        });

        state.set("a", 2).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(state.get("a"), Some(Value::from(2)));

        // Same value, no rerun
        state.set("a", 2).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nan_overwrite_is_unchanged() {
        let state = object(json!({})).reactive();
        state.set("n", f64::NAN).unwrap();
        let reader = state.clone();
        let (_effect, runs) = runs_of(move || {
            reader.get("n");
        });

        state.set("n", f64::NAN).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn adding_and_deleting_keys_reruns_iteration() {
        let state = object(json!({ "a": 1 })).reactive();
        let reader = state.clone();
        let (_effect, runs) = runs_of(move || {
            reader.keys();
        });

        state.set("b", 2).unwrap();
        assert_eq!(runs.get(), 2);

        // Existing key, iteration unaffected
        state.set("b", 3).unwrap();
        assert_eq!(runs.get(), 2);

        assert!(state.delete("a").unwrap());
        assert_eq!(runs.get(), 3);

        assert!(!state.delete("missing").unwrap());
        assert_eq!(runs.get(), 3);
        assert_eq!(state.keys(), vec![Rc::from("b")]);
    }

    #[test]
    fn has_tracks_the_key() {
        let state = object(json!({})).reactive();
        let reader = state.clone();
        let (_effect, runs) = runs_of(move || {
            reader.has("a");
        });

        state.set("a", true).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nested_containers_are_wrapped() {
        let state = object(json!({ "inner": { "n": 1 } })).reactive();
        let inner = state.get("inner").unwrap();
        assert!(crate::observe::is_reactive(&inner));
        assert_eq!(state.get("inner"), Some(inner.clone()));

        let reader = state.clone();
        let (_effect, runs) = runs_of(move || {
            let inner = reader.get("inner").unwrap();
            inner.as_object().unwrap().get("n");
        });

        inner.as_object().unwrap().set("n", 2).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn refs_in_objects_are_unwrapped_and_written_through() {
        let count = Ref::new(Value::from(1));
        let raw = Object::new();
        raw.insert("count", Value::Ref(count.clone()));
        let state = raw.reactive();

        assert_eq!(state.get("count"), Some(Value::from(1)));

        let reader = state.clone();
        let (_effect, runs) = runs_of(move || {
            reader.get("count");
        });

        state.set("count", 5).unwrap();
        assert_eq!(count.get(), Value::from(5));
        assert_eq!(runs.get(), 2);
        assert!(raw.get("count").unwrap().as_value_ref().is_some());
    }

    #[test]
    fn readonly_rejects_writes_and_reads_deeply() {
        let raw = object(json!({ "inner": { "n": 1 } }));
        let view = raw.readonly();

        let err = view.set("x", 1).unwrap_err();
        assert!(matches!(err, Error::Readonly { op: TriggerOp::Set, .. }));
        assert!(view.delete("inner").is_err());
        assert!(raw.get("x").is_none());

        let inner = view.get("inner").unwrap();
        assert!(crate::observe::is_readonly(&inner));
        assert!(inner.as_object().unwrap().set("n", 2).is_err());
    }

    #[test]
    fn readonly_unwraps_refs_readonly() {
        let raw = Object::new();
        raw.insert("r", Value::Ref(Ref::new(Value::from_json(json!({ "n": 1 })))));
        let value = raw.readonly().get("r").unwrap();
        assert!(crate::observe::is_readonly(&value));
    }

    #[test]
    fn push_reruns_length_reader() {
        let list = array(json!([1, 2])).reactive();
        let reader = list.clone();
        let (_effect, runs) = runs_of(move || {
            reader.len();
        });

        assert_eq!(list.push(3).unwrap(), 3);
        assert_eq!(runs.get(), 2);

        assert_eq!(list.pop().unwrap(), Some(Value::from(3)));
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn array_refs_are_returned_intact() {
        let raw = Array::new();
        raw.push(Value::Ref(Ref::new(Value::from(1))));
        let item = raw.reactive().get(0).unwrap();
        assert!(crate::observe::is_ref(&item));
    }

    #[test]
    fn insert_triggers_shifted_indices() {
        let list = array(json!(["a", "b", "c"])).reactive();
        let reader = list.clone();
        let (_effect, last) = runs_of(move || {
            reader.get(2);
        });
        let reader = list.clone();
        let (_effect2, first) = runs_of(move || {
            reader.get(0);
        });

        list.insert(1, "x").unwrap();
        assert_eq!(last.get(), 2);
        assert_eq!(first.get(), 1);
        assert_eq!(
            Value::from(list.to_raw()).to_json().unwrap(),
            json!(["a", "x", "b", "c"])
        );
    }

    #[test]
    fn remove_shifts_down() {
        let list = array(json!([1, 2, 3])).reactive();
        let reader = list.clone();
        let (_effect, runs) = runs_of(move || {
            reader.get(1);
        });

        assert_eq!(list.remove(0).unwrap(), Some(Value::from(1)));
        assert_eq!(runs.get(), 2);
        assert_eq!(list.remove(5).unwrap(), None);
        assert_eq!(list.to_vec(), vec![Value::from(2), Value::from(3)]);
    }

    #[test]
    fn set_past_end_fills_with_null() {
        let list = array(json!([])).reactive();
        list.set(2, "z").unwrap();
        assert_eq!(
            Value::from(list.to_raw()).to_json().unwrap(),
            json!([null, null, "z"])
        );
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn set_beyond_addressable_length_panics() {
        let list = array(json!([])).reactive();
        let _ = list.set(usize::MAX, 1);
    }

    #[test]
    fn truncate_reruns_length_and_removed_readers() {
        let list = array(json!([1, 2, 3])).reactive();
        let reader = list.clone();
        let (_effect, runs) = runs_of(move || {
            reader.get(2);
        });

        list.truncate(5).unwrap();
        assert_eq!(runs.get(), 1);

        list.truncate(1).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn search_matches_proxy_or_raw() {
        let member = Object::new();
        let raw = Array::new();
        raw.push(member.clone());
        raw.push(f64::NAN);
        let list = raw.reactive();

        assert_eq!(list.index_of(member.reactive()), Some(0));
        assert_eq!(list.index_of(member.clone()), Some(0));
        assert_eq!(list.last_index_of(member), Some(0));
        assert_eq!(list.index_of(f64::NAN), None);
        assert!(list.includes(f64::NAN));
    }

    #[test]
    fn readonly_array_rejects_mutators() {
        let view = array(json!([1])).readonly();
        assert!(view.push(2).is_err());
        assert!(view.pop().is_err());
        assert!(view.insert(0, 2).is_err());
        assert!(view.remove(0).is_err());
        assert!(view.truncate(0).is_err());
        assert_eq!(view.len(), 1);
    }
}
