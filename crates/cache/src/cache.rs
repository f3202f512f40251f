//! Windowed asset cache
//!
//! Facade used by the grid view. The input layer reports cursor and focus
//! changes, the frame loop calls [`WindowedAssetCache::tick`] once per frame,
//! and the renderer polls [`WindowedAssetCache::asset_for`] to decide between
//! the real asset, a placeholder, or nothing.

use thumbgrid_scheduler::{Window, WindowTracker};

use crate::backend::{AssetBackend, LoadCompletion};
use crate::config::{CacheConfig, ConfigError};
use crate::error::CacheError;
use crate::item_index::{Item, ItemId, ItemIndex};
use crate::loader::{CacheStats, IncrementalLoader, TickReport};
use crate::slot::AssetState;

/// Keeps only the assets near the cursor resident
///
/// All methods run on the thread that drives `tick()`; nothing here blocks.
///
/// # Example
///
/// ```
/// use thumbgrid_cache::{
///     AssetBackend, CacheConfig, Item, LoadOutcome, LoadRequest, WindowConfig,
///     WindowedAssetCache,
/// };
///
/// struct PathLength;
///
/// impl AssetBackend for PathLength {
///     type Asset = usize;
///
///     fn load(&mut self, request: LoadRequest) -> LoadOutcome<usize> {
///         LoadOutcome::Ready(request.source.as_os_str().len())
///     }
///
///     fn release(&mut self, _asset: usize) {}
/// }
///
/// let config = CacheConfig::for_window(WindowConfig::new(1, 0.6, 4));
/// let mut cache = WindowedAssetCache::new(config, PathLength).unwrap();
///
/// cache.on_collection_changed(vec![
///     Item::new("a", "A", "a.png"),
///     Item::new("b", "B", "b.png"),
///     Item::new("c", "C", "c.png"),
/// ]);
/// cache.on_cursor_moved(0).unwrap();
///
/// cache.tick();
/// assert!(cache.asset_for(0).is_resident());
/// assert!(cache.asset_for(1).is_unloaded());
/// ```
pub struct WindowedAssetCache<B: AssetBackend> {
    config: CacheConfig,
    items: ItemIndex,
    tracker: WindowTracker,
    window: Window,
    focused: bool,
    loader: IncrementalLoader<B::Asset>,
    backend: B,
}

impl<B: AssetBackend> WindowedAssetCache<B> {
    /// Create a cache with an empty collection
    ///
    /// # Errors
    /// Returns an error if `config` fails validation.
    pub fn new(config: CacheConfig, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tracker: WindowTracker::new(config.window),
            loader: IncrementalLoader::new(config.capacity, config.load_budget),
            config,
            items: ItemIndex::new(),
            window: Window::empty(),
            focused: true,
            backend,
        })
    }

    /// Replace the collection.
    ///
    /// Every slot of the old collection is released (or, if still loading,
    /// abandoned) before the new items are installed. The cursor is cleared
    /// until the next [`on_cursor_moved`](Self::on_cursor_moved).
    pub fn on_collection_changed(&mut self, items: impl IntoIterator<Item = Item>) {
        let evicted = self.loader.evict_all(&mut self.backend);
        self.items.populate(items);
        self.tracker.reset();
        self.window = Window::empty();
        log::debug!(
            "collection replaced: {} slots evicted, {} items",
            evicted,
            self.items.len()
        );
    }

    /// Move the cursor to `index` and recompute the window for the next tick.
    ///
    /// On an empty collection this is a no-op that returns an empty window.
    ///
    /// # Errors
    /// Returns [`CacheError::IndexOutOfRange`] if `index` is not a position in
    /// the current collection.
    pub fn on_cursor_moved(&mut self, index: usize) -> Result<Window, CacheError> {
        let len = self.items.len();
        if len == 0 {
            self.tracker.reset();
            self.window = Window::empty();
            self.loader.retarget(&self.window);
            return Ok(self.window);
        }
        if index >= len {
            return Err(CacheError::IndexOutOfRange { index, len });
        }

        let window = self.tracker.on_cursor_move(index, len);
        self.window = if self.focused {
            window
        } else {
            Window::single(index)
        };
        self.loader.retarget(&self.window);
        Ok(self.window)
    }

    /// Move the cursor to the item with the given id
    ///
    /// # Errors
    /// Returns [`CacheError::UnknownItem`] if no item has that id.
    pub fn on_cursor_moved_to_item(&mut self, id: &ItemId) -> Result<Window, CacheError> {
        let index = self
            .items
            .position_of(id)
            .ok_or_else(|| CacheError::UnknownItem(id.clone()))?;
        self.on_cursor_moved(index)
    }

    /// Run one bounded step of load/evict work. Call once per frame.
    pub fn tick(&mut self) -> TickReport {
        self.loader.tick(&self.window, &self.items, &mut self.backend)
    }

    /// Hand over a deferred load completion received outside
    /// [`AssetBackend::poll_completed`].
    ///
    /// Must be called on the tick thread. Returns `true` if the asset became
    /// resident; otherwise it has already been released or recorded as a
    /// failure. An asset whose index left the window since the load was
    /// issued is released even if no tick has evicted its slot yet.
    pub fn on_load_completed(&mut self, completion: LoadCompletion<B::Asset>) -> bool {
        self.loader.complete(completion, &self.window, &mut self.backend)
    }

    /// What the renderer should draw for `index`. Never changes cache state.
    pub fn asset_for(&self, index: usize) -> AssetState<'_, B::Asset> {
        self.loader.state(index)
    }

    /// Shrink to the cursor's slot when the view stops being interactive.
    ///
    /// Everything except the current cursor is evicted immediately, and the
    /// window stays pinned to the cursor until [`on_focus_gained`](Self::on_focus_gained).
    pub fn on_focus_lost(&mut self) {
        self.focused = false;
        self.window = match self.tracker.cursor() {
            Some(cursor) => Window::single(cursor),
            None => Window::empty(),
        };
        let evicted = self.loader.evict_outside(&self.window, &mut self.backend);
        self.loader.retarget(&self.window);
        log::debug!("focus lost: {evicted} slots evicted");
    }

    /// Grow the window back around the cursor, with no direction bias.
    pub fn on_focus_gained(&mut self) {
        self.focused = true;
        self.window = self.tracker.refocus(self.items.len());
        self.loader.retarget(&self.window);
        log::debug!(
            "focus gained: window [{}, {}] ({} indices)",
            self.window.low,
            self.window.high,
            self.window.len()
        );
    }

    /// Whether every index in the window is resident or known to be broken
    pub fn is_settled(&self) -> bool {
        self.loader.is_settled(&self.window)
    }

    /// Current window
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Current cursor index
    pub fn cursor(&self) -> Option<usize> {
        self.window.cursor
    }

    /// Item under the cursor
    pub fn selected_item(&self) -> Option<&Item> {
        self.cursor().and_then(|cursor| self.items.get(cursor).ok())
    }

    /// Current collection
    pub fn items(&self) -> &ItemIndex {
        &self.items
    }

    /// Whether the view currently has focus
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Resident indices, ascending
    pub fn resident_indices(&self) -> Vec<usize> {
        self.loader.resident_indices()
    }

    /// Indices skipped after a failed load
    pub fn failed_indices(&self) -> Vec<usize> {
        self.loader.failed_indices()
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        self.loader.stats()
    }

    /// Take the load-failure and invariant warnings recorded so far
    pub fn drain_warnings(&mut self) -> Vec<CacheError> {
        self.loader.drain_warnings()
    }

    /// Configuration in use
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The asset backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The asset backend, mutably
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AssetBackend> Drop for WindowedAssetCache<B> {
    fn drop(&mut self) {
        self.loader.evict_all(&mut self.backend);

        // Loads that finish now have no slot left and are released
        let mut completions = Vec::new();
        self.backend.poll_completed(&mut completions);
        for completion in completions {
            self.loader.complete(completion, &Window::empty(), &mut self.backend);
        }
    }
}
