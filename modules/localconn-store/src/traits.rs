//! The store adapter boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, StoreError};

/// A persisted key-value store of strings, shared between contexts.
///
/// Each call is assumed atomic on its own. There is no atomic
/// read-modify-write unless the adapter overrides [`compare_and_set`].
///
/// Implemented by `MemorySlotStore` and `FileSlotStore`. Also implemented for
/// `Arc<S>` so several channels can share one store.
///
/// [`compare_and_set`]: SlotStore::compare_and_set
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Current value for `key`, or an empty string when unset.
    async fn get(&self, key: &str) -> Result<String>;

    /// Replace the value for `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Replace the value for `key` only if it still equals `expected`.
    /// Returns `Ok(false)` when another writer got there first.
    async fn compare_and_set(&self, key: &str, expected: &str, value: &str) -> Result<bool> {
        let _ = (key, expected, value);
        Err(StoreError::Unsupported("compare_and_set"))
    }

    /// Whether [`SlotStore::compare_and_set`] is implemented.
    fn supports_compare_and_set(&self) -> bool {
        false
    }
}

#[async_trait]
impl<S: SlotStore + ?Sized> SlotStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<String> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn compare_and_set(&self, key: &str, expected: &str, value: &str) -> Result<bool> {
        (**self).compare_and_set(key, expected, value).await
    }

    fn supports_compare_and_set(&self) -> bool {
        (**self).supports_compare_and_set()
    }
}
