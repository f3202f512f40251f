//! Incremental load scheduling
//!
//! Each tick does a small, bounded amount of work against the current
//! window:
//! 1. Reconcile completions of deferred loads, releasing any whose index
//!    already left the window
//! 2. Evict every slot outside the window (no budget; eviction is cheap and
//!    keeps the live count under the cap)
//! 3. Issue at most `load_budget` new loads, nearest to the cursor first
//!
//! Because step 2 always runs before step 3, a burst of cursor moves can
//! never push the Resident + Pending count past the capacity.

use std::collections::{BTreeSet, VecDeque};
use std::mem;

use serde::Serialize;
use thumbgrid_scheduler::{load_order, Window};

use crate::backend::{AssetBackend, LoadCompletion, LoadOutcome, LoadRequest, LoadTicket};
use crate::error::{AssetError, CacheError};
use crate::item_index::ItemIndex;
use crate::slot::{AssetState, Eviction, SlotTable};

/// Maximum number of warnings kept for [`IncrementalLoader::drain_warnings`]
pub const MAX_WARNINGS: usize = 64;

/// Statistics about cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Slots holding a loaded asset
    pub resident: usize,

    /// Slots waiting for the backend
    pub pending: usize,

    /// Maximum Resident + Pending slots
    pub capacity: usize,

    /// Highest Resident + Pending count ever observed
    pub peak_live: usize,

    /// Loads handed to the backend
    pub loads_issued: u64,

    /// Loads that produced a resident asset
    pub loads_completed: u64,

    /// Loads that failed
    pub load_failures: u64,

    /// Slots evicted (resident or pending)
    pub evictions: u64,

    /// Completions released on arrival because their slot had moved on
    pub discarded_completions: u64,

    /// Loads skipped because the cap was already reached
    pub capacity_violations: u64,
}

impl CacheStats {
    /// Live slot count (Resident + Pending)
    pub fn live(&self) -> usize {
        self.resident + self.pending
    }

    /// Fraction of the capacity in use (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.live() as f64 / self.capacity as f64
        }
    }
}

/// Work done by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Deferred loads stored as resident
    pub completed: usize,

    /// Completions released because their slot was gone
    pub discarded: usize,

    /// Slots evicted
    pub evicted: usize,

    /// Loads issued
    pub loads_issued: usize,
}

impl TickReport {
    /// Whether the tick changed nothing
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// How a completion was reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconciled {
    Stored,
    Discarded,
    Failed,
    Ignored,
}

/// Load/evict scheduler for one item collection
#[derive(Debug)]
pub struct IncrementalLoader<A> {
    slots: SlotTable<A>,

    /// Indices whose last load failed; skipped until they leave the window
    failed: BTreeSet<usize>,

    capacity: usize,
    load_budget: usize,
    next_serial: u64,
    stats: CacheStats,
    warnings: VecDeque<CacheError>,

    /// Reused buffer for backend completions
    completions: Vec<LoadCompletion<A>>,
}

impl<A> IncrementalLoader<A> {
    /// Create a loader
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum Resident + Pending slots
    /// * `load_budget` - Maximum loads issued per tick
    pub fn new(capacity: usize, load_budget: usize) -> Self {
        Self {
            slots: SlotTable::new(),
            failed: BTreeSet::new(),
            capacity,
            load_budget,
            next_serial: 0,
            stats: CacheStats {
                capacity,
                ..Default::default()
            },
            warnings: VecDeque::new(),
            completions: Vec::new(),
        }
    }

    /// Run one bounded step of work toward `window`.
    ///
    /// Never blocks: the backend is only asked to start loads, and finished
    /// deferred loads are picked up through its completion queue.
    pub fn tick<B>(&mut self, window: &Window, items: &ItemIndex, backend: &mut B) -> TickReport
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        let mut report = TickReport::default();

        let mut completions = mem::take(&mut self.completions);
        backend.poll_completed(&mut completions);
        for completion in completions.drain(..) {
            match self.reconcile(completion, window, backend) {
                Reconciled::Stored => report.completed += 1,
                Reconciled::Discarded => report.discarded += 1,
                Reconciled::Failed | Reconciled::Ignored => {}
            }
        }
        self.completions = completions;

        report.evicted = self.evict_outside(window, backend);
        self.retarget(window);

        for index in load_order(window) {
            if report.loads_issued >= self.load_budget {
                break;
            }
            if self.slots.contains(index) || self.failed.contains(&index) {
                continue;
            }
            if self.slots.live() >= self.capacity {
                self.capacity_violation();
                break;
            }
            let source = match items.get(index) {
                Ok(item) => item.asset_source().to_path_buf(),
                Err(err) => {
                    log::error!("window index outside collection: {err}");
                    break;
                }
            };
            self.issue(index, source, backend);
            report.loads_issued += 1;
        }

        if !report.is_idle() {
            log::trace!(
                "tick: {} completed, {} discarded, {} evicted, {} issued, {} live",
                report.completed,
                report.discarded,
                report.evicted,
                report.loads_issued,
                self.slots.live()
            );
        }
        report
    }

    /// Reconcile one deferred load against `window`.
    ///
    /// Returns `true` if the asset became resident. A completion whose slot
    /// was evicted (or re-requested) in the meantime, or whose index is no
    /// longer in `window`, has its asset released immediately instead.
    pub fn complete<B>(
        &mut self,
        completion: LoadCompletion<A>,
        window: &Window,
        backend: &mut B,
    ) -> bool
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        self.reconcile(completion, window, backend) == Reconciled::Stored
    }

    /// Forget failures outside `window` so a later window that re-includes
    /// them retries the load.
    pub fn retarget(&mut self, window: &Window) {
        self.failed.retain(|index| window.contains(*index));
    }

    /// Evict every slot whose index is outside `window`.
    ///
    /// Returns the number of slots evicted.
    pub fn evict_outside<B>(&mut self, window: &Window, backend: &mut B) -> usize
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        let mut evicted = 0;
        for index in self.slots.indices() {
            if window.contains(index) {
                continue;
            }
            if let Some(eviction) = self.slots.evict(index, backend) {
                evicted += 1;
                self.stats.evictions += 1;
                match eviction {
                    Eviction::Released => log::debug!("evicted slot {index}"),
                    Eviction::Abandoned => log::debug!("abandoned pending load for slot {index}"),
                }
            }
        }
        evicted
    }

    /// Evict every slot and forget failures.
    ///
    /// Used when the collection is replaced; in-flight loads are abandoned
    /// and their completions will be released on arrival.
    pub fn evict_all<B>(&mut self, backend: &mut B) -> usize
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        let evicted = self.evict_outside(&Window::empty(), backend);
        self.failed.clear();
        evicted
    }

    /// Renderer view of `index`
    pub fn state(&self, index: usize) -> AssetState<'_, A> {
        self.slots.state(index)
    }

    /// Whether every index of `window` is resident or known to be broken
    pub fn is_settled(&self, window: &Window) -> bool {
        window
            .indices()
            .all(|index| self.slots.state(index).is_resident() || self.failed.contains(&index))
    }

    /// Resident indices, ascending
    pub fn resident_indices(&self) -> Vec<usize> {
        self.slots.resident_indices()
    }

    /// Indices whose last load failed
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().copied().collect()
    }

    /// Resident + Pending slot count
    pub fn live(&self) -> usize {
        self.slots.live()
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            resident: self.slots.resident(),
            pending: self.slots.pending(),
            ..self.stats
        }
    }

    /// Take the recorded warnings, oldest first
    pub fn drain_warnings(&mut self) -> Vec<CacheError> {
        self.warnings.drain(..).collect()
    }

    fn issue<B>(&mut self, index: usize, source: std::path::PathBuf, backend: &mut B)
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        let ticket = LoadTicket {
            index,
            serial: self.next_serial,
        };
        self.next_serial += 1;

        self.slots.begin_load(ticket);
        self.stats.loads_issued += 1;
        self.stats.peak_live = self.stats.peak_live.max(self.slots.live());

        match backend.load(LoadRequest { ticket, source }) {
            LoadOutcome::Ready(asset) => {
                self.reconcile(
                    LoadCompletion {
                        ticket,
                        result: Ok(asset),
                    },
                    &Window::single(index),
                    backend,
                );
            }
            LoadOutcome::Failed(err) => {
                self.slots.abort_load(ticket);
                self.record_failure(index, err);
            }
            LoadOutcome::Deferred => {
                log::debug!("slot {index} pending (load {})", ticket.serial);
            }
        }
    }

    fn reconcile<B>(
        &mut self,
        completion: LoadCompletion<A>,
        window: &Window,
        backend: &mut B,
    ) -> Reconciled
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        let LoadCompletion { ticket, result } = completion;
        if !window.contains(ticket.index) {
            // The cursor moved on before the next tick evicted this slot
            self.slots.abort_load(ticket);
            return match result {
                Ok(asset) => {
                    backend.release(asset);
                    self.stats.discarded_completions += 1;
                    log::debug!(
                        "discarded load {} for index {}: outside the window",
                        ticket.serial,
                        ticket.index
                    );
                    Reconciled::Discarded
                }
                Err(err) => {
                    log::debug!(
                        "ignoring failure of load {} for index {} outside the window: {err}",
                        ticket.serial,
                        ticket.index
                    );
                    Reconciled::Ignored
                }
            };
        }
        match result {
            Ok(asset) => match self.slots.finish_load(ticket, asset) {
                Ok(()) => {
                    self.stats.loads_completed += 1;
                    log::debug!("slot {} resident", ticket.index);
                    Reconciled::Stored
                }
                Err(asset) => {
                    backend.release(asset);
                    self.stats.discarded_completions += 1;
                    log::debug!(
                        "discarded load {} for index {}: slot no longer waiting",
                        ticket.serial,
                        ticket.index
                    );
                    Reconciled::Discarded
                }
            },
            Err(err) => {
                if self.slots.abort_load(ticket) {
                    self.record_failure(ticket.index, err);
                    Reconciled::Failed
                } else {
                    log::debug!(
                        "ignoring failure of abandoned load {} for index {}: {err}",
                        ticket.serial,
                        ticket.index
                    );
                    Reconciled::Ignored
                }
            }
        }
    }

    fn record_failure(&mut self, index: usize, err: AssetError) {
        self.failed.insert(index);
        self.stats.load_failures += 1;

        let warning = CacheError::AssetLoadFailed { index, source: err };
        log::warn!("{warning}");
        self.push_warning(warning);
    }

    fn capacity_violation(&mut self) {
        self.stats.capacity_violations += 1;

        let violation = CacheError::CapacityExceeded {
            live: self.slots.live() + 1,
            capacity: self.capacity,
        };
        log::error!("{violation}");
        self.push_warning(violation);
    }

    fn push_warning(&mut self, warning: CacheError) {
        if self.warnings.len() == MAX_WARNINGS {
            self.warnings.pop_front();
        }
        self.warnings.push_back(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{items, MockBackend};
    use thumbgrid_scheduler::{Direction, WindowConfig};

    fn collection(count: usize) -> ItemIndex {
        items(count).into_iter().collect()
    }

    fn window(radius: usize, cursor: usize, direction: Direction, len: usize) -> Window {
        Window::around(&WindowConfig::new(radius, 0.6, 4), cursor, direction, len)
    }

    #[test]
    fn test_one_load_per_tick() {
        let items = collection(100);
        let window = window(2, 50, Direction::None, 100);
        let mut backend = MockBackend::immediate();
        let mut loader = IncrementalLoader::new(5, 1);

        for expected in 1..=5 {
            let report = loader.tick(&window, &items, &mut backend);
            assert_eq!(report.loads_issued, 1);
            assert_eq!(loader.live(), expected);
        }
        assert!(loader.tick(&window, &items, &mut backend).is_idle());

        let order: Vec<usize> = backend.loads.iter().map(|r| r.ticket.index).collect();
        assert_eq!(order, vec![50, 51, 49, 52, 48]);
    }

    #[test]
    fn test_evicts_before_loading() {
        let items = collection(100);
        let mut backend = MockBackend::immediate();
        let mut loader = IncrementalLoader::new(3, 3);

        let first = window(1, 10, Direction::None, 100);
        loader.tick(&first, &items, &mut backend);
        assert_eq!(loader.resident_indices(), vec![9, 10, 11]);

        // The new window needs all three slots; the old ones go first
        let second = window(1, 60, Direction::None, 100);
        let report = loader.tick(&second, &items, &mut backend);
        assert_eq!(report.evicted, 3);
        assert_eq!(report.loads_issued, 3);
        assert_eq!(loader.resident_indices(), vec![59, 60, 61]);
        assert_eq!(loader.stats().capacity_violations, 0);
        assert_eq!(loader.stats().peak_live, 3);
    }

    #[test]
    fn test_capacity_guard() {
        let items = collection(100);
        let window = window(2, 50, Direction::None, 100);
        let mut backend = MockBackend::immediate();
        let mut loader = IncrementalLoader::new(2, 5);

        let report = loader.tick(&window, &items, &mut backend);
        assert_eq!(report.loads_issued, 2);
        assert_eq!(loader.live(), 2);
        assert_eq!(loader.stats().capacity_violations, 1);

        let warnings = loader.drain_warnings();
        assert!(matches!(
            warnings.as_slice(),
            [CacheError::CapacityExceeded { live: 3, capacity: 2 }]
        ));
    }

    #[test]
    fn test_pending_counts_toward_capacity() {
        let items = collection(100);
        let window = window(1, 50, Direction::None, 100);
        let mut backend = MockBackend::deferred();
        let mut loader = IncrementalLoader::new(3, 1);

        for _ in 0..3 {
            loader.tick(&window, &items, &mut backend);
        }
        assert_eq!(backend.in_flight(), 3);
        assert_eq!(loader.stats().pending, 3);
        assert!(loader.tick(&window, &items, &mut backend).is_idle());
        assert!(!loader.is_settled(&window));

        backend.finish_all();
        let report = loader.tick(&window, &items, &mut backend);
        assert_eq!(report.completed, 3);
        assert!(loader.is_settled(&window));
    }

    #[test]
    fn test_stale_completion_released() {
        let items = collection(100);
        let mut backend = MockBackend::deferred();
        let mut loader = IncrementalLoader::new(3, 1);

        let at_12 = window(1, 12, Direction::None, 100);
        loader.tick(&at_12, &items, &mut backend);
        assert!(loader.state(12).is_pending());

        let at_40 = window(1, 40, Direction::None, 100);
        loader.tick(&at_40, &items, &mut backend);
        assert!(loader.state(12).is_unloaded());

        // Back at 12: a second load is pending when the first one lands
        loader.tick(&at_12, &items, &mut backend);
        assert!(loader.state(12).is_pending());
        backend.finish(12);

        let report = loader.tick(&at_12, &items, &mut backend);
        assert_eq!(report.discarded, 1);
        assert!(loader.state(12).is_pending());
        assert_eq!(backend.released_sources(), vec!["/art/12.png"]);

        backend.finish(12);
        let report = loader.tick(&at_12, &items, &mut backend);
        assert_eq!(report.completed, 1);
        assert!(loader.state(12).is_resident());
    }

    #[test]
    fn test_completion_outside_window_not_stored() {
        let items = collection(100);
        let mut backend = MockBackend::deferred();
        let mut loader = IncrementalLoader::new(3, 1);

        let at_12 = window(1, 12, Direction::None, 100);
        let at_40 = window(1, 40, Direction::None, 100);
        loader.tick(&at_12, &items, &mut backend);

        // Cursor already at 40, no tick has evicted slot 12 yet
        let completion = backend.take_completion(12).unwrap();
        assert!(!loader.complete(completion, &at_40, &mut backend));
        assert!(loader.state(12).is_unloaded());
        assert_eq!(backend.released_sources(), vec!["/art/12.png"]);
        assert_eq!(loader.stats().discarded_completions, 1);
        assert_eq!(loader.stats().loads_completed, 0);
        assert_eq!(loader.live(), 0);
    }

    #[test]
    fn test_polled_completion_outside_window_discarded() {
        let items = collection(100);
        let mut backend = MockBackend::deferred();
        let mut loader = IncrementalLoader::new(3, 1);

        let at_12 = window(1, 12, Direction::None, 100);
        loader.tick(&at_12, &items, &mut backend);
        backend.finish(12);

        let at_40 = window(1, 40, Direction::None, 100);
        let report = loader.tick(&at_40, &items, &mut backend);
        assert_eq!(report.completed, 0);
        assert_eq!(report.discarded, 1);
        assert_eq!(report.evicted, 0);
        assert_eq!(loader.stats().loads_completed, 0);
        assert_eq!(backend.released_sources(), vec!["/art/12.png"]);
        assert!(loader.state(40).is_pending());
    }

    #[test]
    fn test_retarget_forgets_failures_between_ticks() {
        let items = collection(100);
        let mut backend = MockBackend::immediate();
        backend.break_source("/art/10.png");
        let mut loader = IncrementalLoader::new(3, 1);

        let at_10 = window(1, 10, Direction::None, 100);
        loader.tick(&at_10, &items, &mut backend);
        assert_eq!(loader.failed_indices(), vec![10]);

        // Out and back with no tick in between
        loader.retarget(&window(1, 80, Direction::None, 100));
        assert!(loader.failed_indices().is_empty());
        loader.tick(&at_10, &items, &mut backend);
        assert_eq!(loader.failed_indices(), vec![10]);
        assert_eq!(loader.stats().load_failures, 2);
    }

    #[test]
    fn test_failure_forgotten_outside_window() {
        let items = collection(100);
        let mut backend = MockBackend::immediate();
        backend.break_source("/art/10.png");
        let mut loader = IncrementalLoader::new(3, 1);

        let at_10 = window(1, 10, Direction::None, 100);
        loader.tick(&at_10, &items, &mut backend);
        assert_eq!(loader.failed_indices(), vec![10]);
        assert!(loader.state(10).is_unloaded());

        let elsewhere = window(1, 80, Direction::None, 100);
        loader.tick(&elsewhere, &items, &mut backend);
        assert!(loader.failed_indices().is_empty());
    }

    #[test]
    fn test_warnings_are_bounded() {
        let items = collection(200);
        let mut backend = MockBackend::immediate();
        for i in 0..200 {
            backend.break_source(&format!("/art/{i}.png"));
        }
        let mut loader = IncrementalLoader::new(1, 1);

        for cursor in 0..100 {
            let at = window(0, cursor, Direction::None, 200);
            loader.tick(&at, &items, &mut backend);
        }
        assert_eq!(loader.stats().load_failures, 100);
        assert_eq!(loader.drain_warnings().len(), MAX_WARNINGS);
        assert!(loader.drain_warnings().is_empty());
    }

    #[test]
    fn test_evict_all() {
        let items = collection(10);
        let window = window(1, 5, Direction::None, 10);
        let mut backend = MockBackend::immediate();
        let mut loader = IncrementalLoader::new(3, 3);
        loader.tick(&window, &items, &mut backend);

        assert_eq!(loader.evict_all(&mut backend), 3);
        assert_eq!(loader.live(), 0);
        assert_eq!(backend.released_count(), 3);
        assert_eq!(loader.stats().evictions, 3);
    }
}
