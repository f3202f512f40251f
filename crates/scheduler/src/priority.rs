//! Load priority ordering
//!
//! Decides which window index should be loaded next. Indices closer to the
//! cursor go first; between two indices at the same distance, the one on the
//! side the cursor is travelling toward wins.

use std::cmp::Ordering;

use crate::window::{Direction, Window};

/// Sort key for one candidate index
///
/// Ordering is ascending: the smallest key is the most urgent load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadPriority {
    /// Candidate index
    pub index: usize,

    /// Distance from the cursor
    pub distance: usize,

    /// Whether the index lies on the travel side of the cursor (or is the
    /// cursor itself)
    pub ahead: bool,
}

impl LoadPriority {
    /// Compute the priority of `index` relative to `cursor`
    pub fn new(index: usize, cursor: usize, direction: Direction) -> Self {
        let ahead = if direction.is_forward() {
            index >= cursor
        } else {
            index <= cursor
        };
        Self {
            index,
            distance: index.abs_diff(cursor),
            ahead,
        }
    }
}

impl PartialOrd for LoadPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LoadPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            // `true` must sort first
            .then_with(|| other.ahead.cmp(&self.ahead))
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// All indices of `window`, most urgent first
///
/// # Example
///
/// ```
/// use thumbgrid_scheduler::{load_order, Direction, Window, WindowConfig};
///
/// let config = WindowConfig::new(2, 0.0, 4);
/// let window = Window::around(&config, 10, Direction::Left, 100);
/// assert_eq!(load_order(&window), vec![10, 9, 11, 8, 12]);
/// ```
pub fn load_order(window: &Window) -> Vec<usize> {
    let Some(cursor) = window.cursor else {
        return Vec::new();
    };

    let mut priorities: Vec<LoadPriority> = window
        .indices()
        .map(|index| LoadPriority::new(index, cursor, window.direction))
        .collect();
    priorities.sort_unstable();
    priorities.into_iter().map(|priority| priority.index).collect()
}
