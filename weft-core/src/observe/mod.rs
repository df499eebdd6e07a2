//! Observable Containers
//!
//! This module turns plain dynamic data into reactive state. It has three
//! layers:
//!
//! ## Values
//!
//! [`Value`] is a dynamically typed value: a primitive, a container handle, a
//! ref, or a proxy. Containers are shared handles with identity, so the same
//! object can sit in several places at once.
//!
//! ## Raw containers
//!
//! [`Raw<T>`] is untracked storage: [`Object`], [`Array`], [`Map`] and
//! [`Set`]. Reading or writing a raw container never touches the runtime.
//!
//! ## Proxies
//!
//! [`Proxy<T>`] observes a raw container. Reads through a reactive proxy are
//! tracked, writes are triggered, and nested containers come back wrapped.
//! Read-only proxies read the same way and reject every write with
//! [`Error::Readonly`](crate::Error::Readonly).
//!
//! # Example
//!
//! ```rust
//! use weft_core::observe::{reactive, Value};
//! use weft_core::reactive::Effect;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let state = Value::from_json(serde_json::json!({ "count": 1 }));
//! let proxy = reactive(&state).unwrap();
//! let object = proxy.as_object().unwrap().clone();
//!
//! let seen = Rc::new(Cell::new(0.0));
//! let seen_clone = seen.clone();
//! let reader = object.clone();
//! let _effect = Effect::new(move || {
//!     let count = reader.get("count").and_then(|v| v.as_f64()).unwrap_or(0.0);
//!     seen_clone.set(count);
//! });
//!
//! object.set("count", 2).unwrap();
//! assert_eq!(seen.get(), 2.0);
//! ```

mod base;
mod collection;
mod proxy;
mod raw;
mod value;

pub use proxy::{
    is_reactive, is_readonly, is_ref, reactive, readonly, to_raw, unwrap, AnyProxy, ArrayProxy,
    MapProxy, ObjectProxy, Proxy, SetProxy,
};
pub use raw::{Array, Entries, Fields, Items, Map, Members, Object, Raw, Set, Shape};
pub use value::{MapKey, Value};

pub(crate) use proxy::wrap;
