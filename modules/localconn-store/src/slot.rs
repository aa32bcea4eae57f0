//! Slot: one key of a store, treated as an `&`-joined list of entries.

use crate::error::Result;
use crate::traits::SlotStore;

/// Separator between entries in a slot value.
pub const ENTRY_SEPARATOR: &str = "&";

/// A store bound to a single key.
#[derive(Clone)]
pub struct Slot<S> {
    store: S,
    key: String,
}

impl<S: SlotStore> Slot<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn read(&self) -> Result<String> {
        self.store.get(&self.key).await
    }

    pub async fn write(&self, value: &str) -> Result<()> {
        self.store.set(&self.key, value).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.write("").await
    }

    /// Append one entry. Read and write are separate store calls; a
    /// concurrent writer between them is overwritten.
    pub async fn append(&self, entry: &str) -> Result<()> {
        let current = self.read().await?;
        let next = if current.is_empty() {
            entry.to_string()
        } else {
            format!("{current}{ENTRY_SEPARATOR}{entry}")
        };
        self.write(&next).await
    }

    /// Append with compare-and-set, retrying when another writer interleaves.
    /// Returns `Ok(false)` if every attempt lost the race.
    pub async fn append_exclusive(&self, entry: &str, attempts: usize) -> Result<bool> {
        for _ in 0..attempts {
            let current = self.read().await?;
            let next = if current.is_empty() {
                entry.to_string()
            } else {
                format!("{current}{ENTRY_SEPARATOR}{entry}")
            };
            if self.store.compare_and_set(&self.key, &current, &next).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn compare_and_write(&self, expected: &str, value: &str) -> Result<bool> {
        self.store.compare_and_set(&self.key, expected, value).await
    }

    pub fn supports_compare_and_set(&self) -> bool {
        self.store.supports_compare_and_set()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemorySlotStore;

    #[tokio::test]
    async fn append_joins_entries_in_order() {
        let store = Arc::new(MemorySlotStore::new());
        let slot = Slot::new(store.clone(), "localconnection");

        slot.append("1:a:").await.unwrap();
        slot.append("2:b:x,y").await.unwrap();

        assert_eq!(store.value("localconnection"), "1:a:&2:b:x,y");
    }

    #[tokio::test]
    async fn slots_with_different_keys_are_independent() {
        let store = Arc::new(MemorySlotStore::new());
        let first = Slot::new(store.clone(), "first");
        let second = Slot::new(store.clone(), "second");

        first.append("1:a:").await.unwrap();
        second.clear().await.unwrap();

        assert_eq!(first.read().await.unwrap(), "1:a:");
        assert_eq!(second.read().await.unwrap(), "");
    }

    #[tokio::test]
    async fn append_exclusive_lands_on_current_value() {
        let store = Arc::new(MemorySlotStore::new());
        let slot = Slot::new(store.clone(), "k");
        slot.write("1:a:").await.unwrap();

        assert!(slot.append_exclusive("2:b:", 3).await.unwrap());
        assert_eq!(store.value("k"), "1:a:&2:b:");
    }
}
