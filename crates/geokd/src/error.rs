//! Error types for the point store.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while writing, reading or sorting a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from opening, writing, mapping, closing or unlinking a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value that is not a number was pushed into a values-as-index store.
    #[error("Value type error: {0}")]
    ValueType(String),

    /// The value payload could not be serialized or parsed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A single record index outside `[0, len)`.
    #[error("Index {index} out of range for store of length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Store length at the time of the call
        len: usize,
    },

    /// A record range that is reversed or extends past the end of the store.
    #[error("Range {start}..{end} out of bounds for store of length {len}")]
    RangeOutOfBounds {
        /// Inclusive start index
        start: usize,
        /// Exclusive end index
        end: usize,
        /// Store length at the time of the call
        len: usize,
    },

    /// The value payload cannot be addressed by a 32-bit offset/length pair.
    #[error("Values file overflow: payload of {length} bytes at offset {offset}")]
    ValuesOverflow {
        /// Running offset in the values file
        offset: u64,
        /// Length of the payload that did not fit
        length: usize,
    },

    /// On-disk state does not match the record layout.
    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl serde::ser::Error for StoreError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::ValueType(msg.to_string())
    }
}
