//! Exclusively owned asset handle
//!
//! A loaded asset lives in exactly one cache slot. The handle cannot be
//! cloned or copied; the only way to get rid of one is to hand it back to the
//! backend through [`AssetHandle::release`], which consumes it. Releasing the
//! same asset twice therefore does not type-check.

use std::fmt;
use std::ops::Deref;

use crate::backend::AssetBackend;

/// Loaded asset owned by a cache slot
pub struct AssetHandle<A> {
    asset: Option<A>,
}

impl<A> AssetHandle<A> {
    /// Take ownership of a freshly loaded asset
    pub(crate) fn new(asset: A) -> Self {
        Self { asset: Some(asset) }
    }

    /// Borrow the asset
    pub fn get(&self) -> &A {
        // Only `release` empties the option, and it consumes the handle
        self.asset
            .as_ref()
            .unwrap_or_else(|| unreachable!("asset handle used after release"))
    }

    /// Return the asset to the backend that produced it
    pub(crate) fn release<B>(mut self, backend: &mut B)
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        if let Some(asset) = self.asset.take() {
            backend.release(asset);
        }
    }
}

impl<A> Deref for AssetHandle<A> {
    type Target = A;

    fn deref(&self) -> &A {
        self.get()
    }
}

impl<A> Drop for AssetHandle<A> {
    fn drop(&mut self) {
        if self.asset.is_some() {
            log::error!("asset handle dropped without being released to its backend");
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for AssetHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetHandle").field(&self.asset).finish()
    }
}
