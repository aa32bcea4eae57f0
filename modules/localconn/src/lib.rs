//! Cross-context notification over a shared key-value slot.
//!
//! Independent contexts that share nothing but a persisted string store
//! exchange named events with positional string args. Each participant
//! appends `origin:event:args` tokens to one slot and polls it; a consume
//! cycle takes every token written by someone else, rewrites the slot with
//! only its own tokens, and runs the callbacks registered for each event.
//!
//! Delivery is best effort. The store offers no atomic read-modify-write in
//! general, so two participants polling at the same moment can clobber each
//! other's writes and lose or repeat a token. `Consistency::Strict` removes
//! that race on stores with compare-and-set.
//!
//! ```no_run
//! # async fn demo() -> localconn::Result<()> {
//! use std::sync::Arc;
//! use localconn::{ChannelConfig, LocalConnection, Scope};
//! use localconn_store::MemorySlotStore;
//!
//! let store = Arc::new(MemorySlotStore::new());
//! let a = LocalConnection::connect(store.clone(), ChannelConfig::default()).await?;
//! let b = LocalConnection::connect(store, ChannelConfig::default()).await?;
//!
//! b.add_callback("ping", |_: &Scope, args: &[String]| -> anyhow::Result<()> {
//!     println!("ping {args:?}");
//!     Ok(())
//! });
//! a.send("ping", &["x", "y"]).await;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod codec;
pub mod config;
pub mod consume;
pub mod dispatch;
pub mod error;
pub mod origin;
pub mod poller;
pub mod registry;
pub mod state;

pub use channel::LocalConnection;
pub use codec::{decode_batch, encode, CodecError, EventToken};
pub use config::{ChannelConfig, Consistency};
pub use consume::CycleReport;
pub use error::{ChannelError, Result};
pub use origin::OriginId;
pub use registry::{Callback, ChannelInfo, Scope};
