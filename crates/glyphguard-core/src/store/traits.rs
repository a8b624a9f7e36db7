//! Durable key-value store contract.

use crate::error::Result;
use serde_json::Value;

/// Opaque durable key-value storage, one JSON value per key.
///
/// Writes to a single key are atomic; nothing else is promised. All operations
/// are synchronous to match rusqlite's API.
pub trait OptionStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Returns `true` when the write was performed and `false` when the store
    /// refused it. Every accepted call is a durable write, even when the value
    /// is unchanged.
    fn update(&self, key: &str, value: &Value) -> Result<bool>;

    /// Remove `key`. Returns `true` if a value was removed.
    fn delete(&self, key: &str) -> Result<bool>;
}
