//! Observed targets and the keys read from them.
//!
//! Every piece of observable state (a ref, a raw object, a raw collection, or a
//! host-defined type) carries a [`TargetId`]. The runtime indexes dependencies
//! by `(TargetId, Key)` and never holds the target itself, so targets are free
//! to be dropped at any time.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::observe::MapKey;

/// Identity of an observed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a fresh target identity.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A property key within a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named field of an object (or the synthetic `"value"` of a ref).
    Prop(Cow<'static, str>),
    /// A position in an array.
    Index(usize),
    /// An entry of a map or a member of a set.
    Entry(MapKey),
    /// Iteration sentinel for arrays: insertion and removal change it.
    Length,
    /// Iteration sentinel for objects, maps and sets.
    Iterate,
}

impl Key {
    /// The key every ref is tracked and triggered under.
    pub const VALUE: Key = Key::Prop(Cow::Borrowed("value"));

    pub fn prop(name: &str) -> Self {
        Key::Prop(Cow::Owned(name.to_owned()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Prop(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
            Key::Entry(key) => write!(f, "{key}"),
            Key::Length => f.write_str("length"),
            Key::Iterate => f.write_str("<iterate>"),
        }
    }
}

/// The kind of mutation being reported to [`trigger`](super::trigger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOp {
    /// An existing key changed value.
    Set,
    /// A key that did not exist was created.
    Add,
    /// An existing key was removed.
    Delete,
    /// Every key of the target was removed.
    Clear,
}

impl fmt::Display for TriggerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerOp::Set => "set",
            TriggerOp::Add => "add",
            TriggerOp::Delete => "delete",
            TriggerOp::Clear => "clear",
        })
    }
}

/// Anything the runtime can track reads of and trigger writes to.
///
/// Hosts that need custom reactivity outside the proxy layer implement this
/// for their own types (or pass a bare [`TargetId`]) and call
/// [`track`](super::track) / [`trigger`](super::trigger) directly.
pub trait Target {
    fn target_id(&self) -> TargetId;

    /// The key that `Add`/`Delete` additionally trigger.
    ///
    /// Array-like targets return [`Key::Length`] so that insertions and
    /// removals wake order- and length-dependent readers.
    fn iteration_key(&self) -> Key {
        Key::Iterate
    }
}

impl Target for TargetId {
    fn target_id(&self) -> TargetId {
        *self
    }
}
