//! Error types for the asset cache

use std::io;
use std::path::PathBuf;

use crate::item_index::ItemId;

/// Why a single asset failed to load
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("asset backend is no longer running")]
    Disconnected,
}

/// Errors raised by the windowed asset cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Caller addressed an index outside the current collection
    #[error("index {index} out of range for collection of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    /// Caller addressed an item that is not in the current collection
    #[error("item {0} is not in the current collection")]
    UnknownItem(ItemId),

    /// A backend load failed; recorded as a warning, never returned
    #[error("failed to load asset for index {index}: {source}")]
    AssetLoadFailed {
        index: usize,
        #[source]
        source: AssetError,
    },

    /// A load would have pushed the live slot count past the cap
    #[error("live slot count {live} would exceed capacity {capacity}")]
    CapacityExceeded { live: usize, capacity: usize },
}
