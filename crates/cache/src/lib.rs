//! Thumbgrid Cache Library
//!
//! Windowed lazy asset cache for large scrolling grids. Only the assets in a
//! window around the cursor are kept resident; everything else is released.
//! Work is spread over frames: each `tick()` evicts what left the window and
//! issues at most `load_budget` new loads, nearest to the cursor first.
//!
//! - [`WindowedAssetCache`]: facade driven by the view's input and frame loop
//! - [`AssetBackend`]: what actually loads and frees assets
//! - [`ThreadedBackend`]: backend that decodes on worker threads

mod backend;
mod cache;
mod config;
mod error;
mod handle;
mod item_index;
mod loader;
mod slot;
#[cfg(test)]
mod testing;
mod worker;

pub use backend::{AssetBackend, LoadCompletion, LoadOutcome, LoadRequest, LoadTicket};
pub use cache::WindowedAssetCache;
pub use config::{CacheConfig, ConfigError};
pub use error::{AssetError, CacheError};
pub use handle::AssetHandle;
pub use item_index::{Item, ItemId, ItemIndex};
pub use loader::{CacheStats, IncrementalLoader, TickReport, MAX_WARNINGS};
pub use slot::AssetState;
pub use worker::{AssetDecoder, ThreadedBackend};

pub use thumbgrid_scheduler::{Direction, Window, WindowConfig};
