//! In-process slot store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::SlotStore;

/// In-memory store shared by every channel holding an `Arc` to it.
///
/// Mirrors a browser-style storage area: string values, an optional per-value
/// size ceiling, atomic single calls. Supports compare-and-set. Counts
/// accepted writes so tests can assert that a cycle did not touch the store.
pub struct MemorySlotStore {
    values: Mutex<HashMap<String, String>>,
    max_value_len: Option<usize>,
    writes: AtomicUsize,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            max_value_len: None,
            writes: AtomicUsize::new(0),
        }
    }

    /// Reject values longer than `limit` bytes.
    pub fn with_max_value_len(mut self, limit: usize) -> Self {
        self.max_value_len = Some(limit);
        self
    }

    /// Read a value without going through the async trait (for assertions).
    pub fn value(&self, key: &str) -> String {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    /// Number of writes accepted so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_len(&self, key: &str, value: &str) -> Result<()> {
        match self.max_value_len {
            Some(limit) if value.len() > limit => Err(StoreError::CapacityExceeded {
                key: key.to_string(),
                len: value.len(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

impl Default for MemorySlotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn get(&self, key: &str) -> Result<String> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_len(key, value)?;
        self.lock().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn compare_and_set(&self, key: &str, expected: &str, value: &str) -> Result<bool> {
        self.check_len(key, value)?;
        let mut values = self.lock();
        let current = values.get(key).map(String::as_str).unwrap_or("");
        if current != expected {
            return Ok(false);
        }
        values.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn supports_compare_and_set(&self) -> bool {
        true
    }
}
