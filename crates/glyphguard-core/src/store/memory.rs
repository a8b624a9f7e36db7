//! In-memory option store with fault injection.

use super::traits::OptionStore;
use crate::error::{GlyphError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// Volatile option store for development servers and tests.
///
/// Counts accepted writes and can be told to refuse writes or fail reads.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    values: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
    refuse_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes the store has accepted.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// When set, `update` returns `Ok(false)` without writing.
    pub fn set_refuse_writes(&self, refuse: bool) {
        self.refuse_writes.store(refuse, Ordering::SeqCst);
    }

    /// When set, `get` returns a database error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GlyphError::Database {
                message: format!("Injected read failure for {}", key),
                source: None,
            });
        }
        let values = self.values.read().map_err(|_| GlyphError::Database {
            message: "Failed to acquire memory store lock".to_string(),
            source: None,
        })?;
        Ok(values.get(key).cloned())
    }

    fn update(&self, key: &str, value: &Value) -> Result<bool> {
        if self.refuse_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut values = self.values.write().map_err(|_| GlyphError::Database {
            message: "Failed to acquire memory store lock".to_string(),
            source: None,
        })?;
        values.insert(key.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut values = self.values.write().map_err(|_| GlyphError::Database {
            message: "Failed to acquire memory store lock".to_string(),
            source: None,
        })?;
        Ok(values.remove(key).is_some())
    }
}
