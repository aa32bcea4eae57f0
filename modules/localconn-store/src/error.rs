use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused a value over its size ceiling.
    #[error("value for '{key}' is {len} bytes, limit is {limit}")]
    CapacityExceeded { key: String, len: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter does not implement an optional operation.
    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    /// True when the store itself refused the write (as opposed to failing to
    /// reach it).
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::CapacityExceeded { .. })
    }
}
