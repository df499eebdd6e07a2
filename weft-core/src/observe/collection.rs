//! Map and set proxies.
//!
//! Keys and values are converted to raw form before they reach the raw
//! collection, so a proxy and its target are the same key. Reads of a single
//! entry track `Key::Entry`; size and iteration track `Key::Iterate`.

use super::proxy::{MapProxy, SetProxy};
use super::value::{has_changed, MapKey, Value};
use crate::error::Result;
use crate::reactive::{Key, TriggerOp};

fn normalize(value: impl Into<Value>) -> (MapKey, Value) {
    let raw = value.into().into_raw();
    (MapKey::of(&raw), raw)
}

impl MapProxy {
    pub fn get(&self, key: impl Into<Value>) -> Option<Value> {
        let (key, _) = normalize(key);
        let value = self
            .raw()
            .data()
            .0
            .get(&key)
            .map(|(_, value)| value.clone());
        self.track(Key::Entry(key));
        value.map(|value| self.wrap(value))
    }

    pub fn has(&self, key: impl Into<Value>) -> bool {
        let (key, _) = normalize(key);
        let found = self.raw().data().0.contains_key(&key);
        self.track(Key::Entry(key));
        found
    }

    pub fn size(&self) -> usize {
        self.track(Key::Iterate);
        self.raw().data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Insert or replace an entry.
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let (key, raw_key) = normalize(key);
        self.check_writable(TriggerOp::Set, || Key::Entry(key.clone()))?;
        let value = value.into().into_raw();

        let old = self
            .raw()
            .data_mut()
            .0
            .insert(key.clone(), (raw_key, value.clone()))
            .map(|(_, old)| old);

        match old {
            None => self.trigger(TriggerOp::Add, Key::Entry(key)),
            Some(old) if has_changed(&old, &value) => self.trigger(TriggerOp::Set, Key::Entry(key)),
            Some(_) => {}
        }
        Ok(())
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&self, key: impl Into<Value>) -> Result<bool> {
        let (key, _) = normalize(key);
        self.check_writable(TriggerOp::Delete, || Key::Entry(key.clone()))?;
        let removed = self.raw().data_mut().0.shift_remove(&key);
        let existed = removed.is_some();
        drop(removed);

        if existed {
            self.trigger(TriggerOp::Delete, Key::Entry(key));
        }
        Ok(existed)
    }

    /// Remove every entry. Triggers only if the map had any.
    pub fn clear(&self) -> Result<()> {
        self.check_writable(TriggerOp::Clear, || Key::Iterate)?;
        let removed = std::mem::take(&mut self.raw().data_mut().0);
        if !removed.is_empty() {
            drop(removed);
            self.trigger(TriggerOp::Clear, Key::Iterate);
        }
        Ok(())
    }

    pub fn keys(&self) -> Vec<Value> {
        self.track(Key::Iterate);
        let keys: Vec<Value> = self
            .raw()
            .data()
            .0
            .values()
            .map(|(key, _)| key.clone())
            .collect();
        keys.into_iter().map(|key| self.wrap(key)).collect()
    }

    /// Values in insertion order. Also reruns when any value is replaced.
    pub fn values(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(_, value)| value).collect()
    }

    /// `(key, value)` pairs in insertion order. Also reruns when any value
    /// is replaced.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.track(Key::Iterate);
        let entries: Vec<(MapKey, Value, Value)> = self
            .raw()
            .data()
            .0
            .iter()
            .map(|(normalized, (key, value))| (normalized.clone(), key.clone(), value.clone()))
            .collect();

        entries
            .into_iter()
            .map(|(normalized, key, value)| {
                self.track(Key::Entry(normalized));
                (self.wrap(key), self.wrap(value))
            })
            .collect()
    }

    /// Normalized keys, untracked.
    pub fn key_set(&self) -> Vec<MapKey> {
        self.raw().data().0.keys().cloned().collect()
    }

    /// Call `f` with every key and value.
    pub fn for_each(&self, mut f: impl FnMut(&Value, &Value)) {
        for (key, value) in self.entries() {
            f(&key, &value);
        }
    }
}

impl SetProxy {
    /// Add a member. Returns false if it was already present.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool> {
        let (key, raw) = normalize(value);
        self.check_writable(TriggerOp::Add, || Key::Entry(key.clone()))?;

        let added = {
            let mut members = self.raw().data_mut();
            if members.0.contains_key(&key) {
                false
            } else {
                members.0.insert(key.clone(), raw);
                true
            }
        };

        if added {
            self.trigger(TriggerOp::Add, Key::Entry(key));
        }
        Ok(added)
    }

    pub fn has(&self, value: impl Into<Value>) -> bool {
        let (key, _) = normalize(value);
        let found = self.raw().data().0.contains_key(&key);
        self.track(Key::Entry(key));
        found
    }

    /// Remove a member. Returns whether it existed.
    pub fn delete(&self, value: impl Into<Value>) -> Result<bool> {
        let (key, _) = normalize(value);
        self.check_writable(TriggerOp::Delete, || Key::Entry(key.clone()))?;
        let removed = self.raw().data_mut().0.shift_remove(&key);
        let existed = removed.is_some();
        drop(removed);

        if existed {
            self.trigger(TriggerOp::Delete, Key::Entry(key));
        }
        Ok(existed)
    }

    /// Remove every member. Triggers only if the set had any.
    pub fn clear(&self) -> Result<()> {
        self.check_writable(TriggerOp::Clear, || Key::Iterate)?;
        let removed = std::mem::take(&mut self.raw().data_mut().0);
        if !removed.is_empty() {
            drop(removed);
            self.trigger(TriggerOp::Clear, Key::Iterate);
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.track(Key::Iterate);
        self.raw().data().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn values(&self) -> Vec<Value> {
        self.track(Key::Iterate);
        let members: Vec<Value> = self.raw().data().0.values().cloned().collect();
        members.into_iter().map(|member| self.wrap(member)).collect()
    }

    /// Same as [`values`](Self::values): a set's keys are its members.
    pub fn keys(&self) -> Vec<Value> {
        self.values()
    }

    /// Each member paired with itself.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.values()
            .into_iter()
            .map(|member| (member.clone(), member))
            .collect()
    }

    pub fn for_each(&self, mut f: impl FnMut(&Value)) {
        for member in self.values() {
            f(&member);
        }
    }
}
