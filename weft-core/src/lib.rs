//! Weft Core
//!
//! This crate provides the reactive core of the Weft component framework.
//! It implements:
//!
//! - Automatic dependency tracking between effects and the state they read
//! - Refs and lazily recomputed computed refs
//! - Reactive and read-only proxies over dynamic objects, arrays, maps and sets
//! - Batched and tick-deferred host schedulers
//!
//! Everything is single-threaded: reactive state lives in thread-local
//! storage and handles are `!Send`.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: effects, refs, computed refs and the dependency registry
//! - `observe`: dynamic values, raw containers and their proxies
//! - `scheduler`: job queues for effects created with a scheduler
//!
//! # Example
//!
//! ```rust
//! use weft_core::reactive::{Computed, Effect, Ref};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! // Create a ref
//! let count = Ref::new(1);
//!
//! // Create a derived value
//! let count_clone = count.clone();
//! let doubled = Computed::new(move || count_clone.get() * 2);
//!
//! // Create an effect
//! let seen = Rc::new(Cell::new(0));
//! let seen_clone = seen.clone();
//! let doubled_clone = doubled.clone();
//! let _effect = Effect::new(move || seen_clone.set(doubled_clone.get()));
//!
//! // Update the ref; the effect reruns synchronously
//! count.set(5);
//! assert_eq!(seen.get(), 10);
//! ```

pub mod observe;
pub mod reactive;
pub mod scheduler;

mod error;

pub use error::{Error, Result};
