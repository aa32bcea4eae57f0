//! Typed errors for channel operations.

use localconn_store::StoreError;
use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// A slot entry could not be decoded into a token.
    #[error("malformed token '{token}': {source}")]
    MalformedToken {
        token: String,
        #[source]
        source: CodecError,
    },

    /// The store refused a write (over its size ceiling).
    #[error("store rejected write to '{key}': {source}")]
    StoreWriteRejected {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The store could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Compare-and-set kept losing to other writers.
    #[error("slot '{key}' kept changing, gave up after {attempts} attempts")]
    Contended { key: String, attempts: usize },

    /// A registered callback returned an error or panicked.
    #[error("callback for '{event}' failed: {message}")]
    CallbackFailed { event: String, message: String },
}

impl ChannelError {
    /// Classify a store error raised while writing `key`.
    pub(crate) fn from_write(key: &str, err: StoreError) -> Self {
        if err.is_rejection() {
            ChannelError::StoreWriteRejected {
                key: key.to_string(),
                source: err,
            }
        } else {
            ChannelError::Store(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
