//! Cache store errors.
//!
//! All of these are transient and infrastructural from the write path's
//! point of view: they are logged and tolerated there. Only the self-healing
//! read surfaces them to its caller.

use thiserror::Error;

/// Error talking to the key/value store or decoding what it returned.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The operation did not complete within the configured timeout.
    #[error("cache {op} on '{key}' timed out")]
    Timeout {
        /// Store operation (`get`, `hset`, ...).
        op: &'static str,
        /// Key involved.
        key: String,
    },

    /// The store rejected the operation or is unreachable.
    #[error("cache {op} on '{key}' failed: {reason}")]
    Backend {
        /// Store operation.
        op: &'static str,
        /// Key involved.
        key: String,
        /// Backend message.
        reason: String,
    },

    /// The key holds a value of another type (string vs hash).
    #[error("cache key '{key}' holds the wrong kind of value")]
    WrongType {
        /// Key involved.
        key: String,
    },

    /// The stored value could not be decoded.
    #[error("cache key '{key}' holds a corrupt value: {reason}")]
    Corrupt {
        /// Key involved.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// The record is still absent after a recompute-and-republish.
    #[error("cache key '{key}' is missing after recompute")]
    Missing {
        /// Key involved.
        key: String,
    },

    /// The source data needed to recompute a record could not be loaded.
    #[error("cannot recompute derived record: {0}")]
    Recompute(String),
}

impl CacheError {
    pub(crate) fn backend(op: &'static str, key: &str, reason: impl ToString) -> Self {
        Self::Backend {
            op,
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
