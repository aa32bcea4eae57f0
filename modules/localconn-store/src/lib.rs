//! Shared string slot stores.
//!
//! A slot is a single string value under a key in a persisted key-value
//! store. Channels in unrelated execution contexts use one slot as their only
//! transport. This crate knows nothing about tokens, origins or callbacks.
//!
//! Adapters implement [`SlotStore`]: `get` returns an empty string for an
//! unset key, `set` replaces the value and may reject it with
//! [`StoreError::CapacityExceeded`]. Compare-and-set is optional.

pub mod error;
pub mod file;
pub mod memory;
pub mod slot;
pub mod traits;

pub use error::{Result, StoreError};
pub use file::FileSlotStore;
pub use memory::MemorySlotStore;
pub use slot::Slot;
pub use traits::SlotStore;
