//! Errors raised by the reactive core.

use thiserror::Error;

use crate::reactive::{Key, TriggerOp};

#[derive(Error, Debug)]
pub enum Error {
    /// A mutating operation was attempted through a read-only proxy.
    #[error("cannot {op} key `{key}`: target is readonly")]
    Readonly { op: TriggerOp, key: Key },

    /// `reactive`/`readonly` was called on a value that is not a container.
    #[error("value of kind `{kind}` cannot be made reactive")]
    NotObservable { kind: &'static str },

    #[error("snapshot conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
