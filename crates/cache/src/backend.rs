//! Asset backend interface
//!
//! The cache decides what to load and unload; a backend does the actual
//! decode/upload and frees memory. Loads may finish immediately or later:
//! a backend that works on other threads answers [`LoadOutcome::Deferred`]
//! and later hands a [`LoadCompletion`] back on the tick thread through
//! [`AssetBackend::poll_completed`].

use std::path::PathBuf;

use crate::error::AssetError;

/// Identifies one load request
///
/// Serials are never reused, so a completion can always be matched against
/// the request that is currently pending for its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    /// Item index the load was issued for
    pub index: usize,

    /// Unique request number
    pub serial: u64,
}

/// A request to load one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub source: PathBuf,
}

/// Immediate answer to a load request
#[derive(Debug)]
pub enum LoadOutcome<A> {
    /// Asset loaded synchronously
    Ready(A),

    /// Load failed synchronously
    Failed(AssetError),

    /// Load continues in the background; a completion will follow
    Deferred,
}

/// Result of a deferred load
#[derive(Debug)]
pub struct LoadCompletion<A> {
    pub ticket: LoadTicket,
    pub result: Result<A, AssetError>,
}

/// Performs asset loads and releases on behalf of the cache
///
/// `load` must not block on a slow decode; backends that cannot decode
/// quickly should return [`LoadOutcome::Deferred`] and finish elsewhere.
/// `release` must not fail.
pub trait AssetBackend {
    /// Loaded asset type
    type Asset;

    /// Start loading the asset for `request`
    fn load(&mut self, request: LoadRequest) -> LoadOutcome<Self::Asset>;

    /// Move finished deferred loads into `completed`.
    ///
    /// Called at the start of every tick, on the tick thread. Backends that
    /// only answer synchronously keep the default.
    fn poll_completed(&mut self, completed: &mut Vec<LoadCompletion<Self::Asset>>) {
        let _ = completed;
    }

    /// Free an asset previously produced by this backend
    fn release(&mut self, asset: Self::Asset);
}

impl<B: AssetBackend + ?Sized> AssetBackend for Box<B> {
    type Asset = B::Asset;

    fn load(&mut self, request: LoadRequest) -> LoadOutcome<Self::Asset> {
        (**self).load(request)
    }

    fn poll_completed(&mut self, completed: &mut Vec<LoadCompletion<Self::Asset>>) {
        (**self).poll_completed(completed)
    }

    fn release(&mut self, asset: Self::Asset) {
        (**self).release(asset)
    }
}
