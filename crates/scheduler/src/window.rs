//! Cursor-driven load window
//!
//! Computes the contiguous range of item indices whose assets should be
//! resident, given the cursor position in a grid and the direction the
//! cursor last travelled. The window leans toward the direction of travel
//! so loading keeps ahead of scrolling:
//! - Right/Down: more indices after the cursor than before it
//! - Left/Up: more indices before the cursor than after it
//! - None (first placement, focus regained): symmetric

use serde::{Deserialize, Serialize};

/// Window shape parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Half-width of the window around the cursor
    pub radius: usize,

    /// Fraction of the radius moved from the trailing side to the leading
    /// side while the cursor is travelling (0.0 = symmetric, 1.0 = nothing
    /// kept behind the cursor)
    pub forward_bias: f64,

    /// Number of columns in the grid; an Up/Down move changes the cursor by
    /// this amount
    pub columns: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            radius: 10,
            forward_bias: 0.6,
            columns: 4,
        }
    }
}

impl WindowConfig {
    /// Create a window configuration
    pub fn new(radius: usize, forward_bias: f64, columns: usize) -> Self {
        Self {
            radius,
            forward_bias,
            columns,
        }
    }

    /// Set the window radius
    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Set the forward bias
    pub fn with_forward_bias(mut self, forward_bias: f64) -> Self {
        self.forward_bias = forward_bias;
        self
    }

    /// Set the grid column count
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    /// Number of indices moved from behind the cursor to ahead of it while
    /// travelling
    pub fn lead_shift(&self) -> usize {
        let bias = self.forward_bias.clamp(0.0, 1.0);
        ((self.radius as f64 * bias).round() as usize).min(self.radius)
    }

    /// Widest window this configuration can produce
    pub fn max_width(&self) -> usize {
        self.radius * 2 + 1
    }
}

/// Direction of the last cursor movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
    #[default]
    None,
}

impl Direction {
    /// Classify a cursor move from `previous` to `next`.
    ///
    /// A step of one index is horizontal even when it wraps onto another
    /// row. Steps of a whole row are vertical, and so is any other jump, in
    /// the direction of its sign.
    pub fn between(previous: usize, next: usize) -> Option<Direction> {
        match next.cmp(&previous) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater if next - previous == 1 => Some(Direction::Right),
            std::cmp::Ordering::Greater => Some(Direction::Down),
            std::cmp::Ordering::Less if previous - next == 1 => Some(Direction::Left),
            std::cmp::Ordering::Less => Some(Direction::Up),
        }
    }

    /// Cursor index reached by one step in this direction on a grid with
    /// `columns` columns and `len` items, or `None` if the step leaves the
    /// collection.
    pub fn step(self, cursor: usize, columns: usize, len: usize) -> Option<usize> {
        let columns = columns.max(1);
        let next = match self {
            Direction::Left => cursor.checked_sub(1)?,
            Direction::Right => cursor.checked_add(1)?,
            Direction::Up => cursor.checked_sub(columns)?,
            Direction::Down => cursor.checked_add(columns)?,
            Direction::None => cursor,
        };
        (next < len).then_some(next)
    }

    /// Whether travel in this direction heads toward higher indices.
    ///
    /// `None` counts as forward so that symmetric ties resolve toward the
    /// natural reading order.
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Right | Direction::Down | Direction::None)
    }

    /// Whether this direction biases the window
    pub fn is_travelling(self) -> bool {
        self != Direction::None
    }
}

/// Contiguous range of indices that should be resident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    /// Lowest index in the window (inclusive)
    pub low: usize,

    /// Highest index in the window (inclusive)
    pub high: usize,

    /// Cursor index, `None` when the collection is empty
    pub cursor: Option<usize>,

    /// Direction of the move that produced this window
    pub direction: Direction,
}

impl Window {
    /// A window covering nothing
    pub fn empty() -> Self {
        Self {
            low: 0,
            high: 0,
            cursor: None,
            direction: Direction::None,
        }
    }

    /// A window covering only the cursor
    pub fn single(cursor: usize) -> Self {
        Self {
            low: cursor,
            high: cursor,
            cursor: Some(cursor),
            direction: Direction::None,
        }
    }

    /// Compute the window around `cursor` for a collection of `len` items
    pub fn around(config: &WindowConfig, cursor: usize, direction: Direction, len: usize) -> Self {
        if len == 0 {
            return Self::empty();
        }
        let cursor = cursor.min(len - 1);

        let (behind, ahead) = if direction.is_travelling() {
            let shift = config.lead_shift();
            let trail = config.radius - shift;
            let lead = config.radius + shift;
            if direction.is_forward() {
                (trail, lead)
            } else {
                (lead, trail)
            }
        } else {
            (config.radius, config.radius)
        };

        Self {
            low: cursor.saturating_sub(behind),
            high: cursor.saturating_add(ahead).min(len - 1),
            cursor: Some(cursor),
            direction,
        }
    }

    /// Whether the window covers no indices
    pub fn is_empty(&self) -> bool {
        self.cursor.is_none()
    }

    /// Number of indices in the window
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.high - self.low + 1
        }
    }

    /// Whether `index` falls inside the window
    pub fn contains(&self, index: usize) -> bool {
        !self.is_empty() && index >= self.low && index <= self.high
    }

    /// All indices in the window, ascending
    #[allow(clippy::reversed_empty_ranges)]
    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        if self.is_empty() {
            1..=0
        } else {
            self.low..=self.high
        }
    }

    /// Number of indices after the cursor
    pub fn ahead(&self) -> usize {
        self.cursor.map_or(0, |cursor| self.high - cursor)
    }

    /// Number of indices before the cursor
    pub fn behind(&self) -> usize {
        self.cursor.map_or(0, |cursor| cursor - self.low)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::empty()
    }
}

/// Tracks the cursor and produces a new window on every move
///
/// # Example
///
/// ```
/// use thumbgrid_scheduler::{Direction, WindowConfig, WindowTracker};
///
/// let mut tracker = WindowTracker::new(WindowConfig::new(5, 0.6, 4));
///
/// let first = tracker.on_cursor_move(49, 1000);
/// assert_eq!(first.direction, Direction::None);
///
/// let window = tracker.on_cursor_move(50, 1000);
/// assert_eq!(window.direction, Direction::Right);
/// assert!(window.ahead() > window.behind());
/// ```
#[derive(Debug, Clone)]
pub struct WindowTracker {
    config: WindowConfig,
    cursor: Option<usize>,
    direction: Direction,
}

impl WindowTracker {
    /// Create a tracker with no cursor
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            cursor: None,
            direction: Direction::None,
        }
    }

    /// Move the cursor to `new_index` in a collection of `len` items.
    ///
    /// Out-of-range indices are clamped; callers validate against their own
    /// collection before calling.
    pub fn on_cursor_move(&mut self, new_index: usize, len: usize) -> Window {
        if len == 0 {
            self.reset();
            return Window::empty();
        }
        let new_index = new_index.min(len - 1);

        self.direction = match self.cursor {
            Some(previous) => Direction::between(previous, new_index).unwrap_or(self.direction),
            None => Direction::None,
        };
        self.cursor = Some(new_index);

        let window = Window::around(&self.config, new_index, self.direction, len);
        log::debug!(
            "cursor {} moved {:?}: window [{}, {}]",
            new_index,
            self.direction,
            window.low,
            window.high
        );
        window
    }

    /// Recompute the window around the current cursor with no direction.
    ///
    /// Used when the view regains focus and the window has to grow back from
    /// its shrunk state even though the cursor did not move.
    pub fn refocus(&mut self, len: usize) -> Window {
        match self.cursor {
            Some(cursor) if len > 0 => {
                self.direction = Direction::None;
                let cursor = cursor.min(len - 1);
                self.cursor = Some(cursor);
                Window::around(&self.config, cursor, Direction::None, len)
            }
            _ => {
                self.reset();
                Window::empty()
            }
        }
    }

    /// Forget the cursor (collection replaced)
    pub fn reset(&mut self) {
        self.cursor = None;
        self.direction = Direction::None;
    }

    /// Current cursor index
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Direction of the last move
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Window configuration
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(radius: usize) -> WindowConfig {
        WindowConfig::new(radius, 0.6, 4)
    }

    #[test]
    fn test_default_config() {
        let config = WindowConfig::default();
        assert_eq!(config.radius, 10);
        assert_eq!(config.columns, 4);
        assert_eq!(config.max_width(), 21);
    }

    #[test]
    fn test_lead_shift() {
        assert_eq!(config(5).lead_shift(), 3);
        assert_eq!(config(5).with_forward_bias(0.0).lead_shift(), 0);
        assert_eq!(config(5).with_forward_bias(1.0).lead_shift(), 5);
        // Out-of-range bias is clamped rather than overflowing the radius
        assert_eq!(config(5).with_forward_bias(3.0).lead_shift(), 5);
    }

    #[test]
    fn test_direction_between() {
        assert_eq!(Direction::between(5, 6), Some(Direction::Right));
        assert_eq!(Direction::between(6, 5), Some(Direction::Left));
        assert_eq!(Direction::between(5, 9), Some(Direction::Down));
        assert_eq!(Direction::between(9, 5), Some(Direction::Up));
        assert_eq!(Direction::between(5, 5), None);
    }

    #[test]
    fn test_row_wrap_is_horizontal() {
        // End of row 0 to start of row 1 in a 4-column grid
        assert_eq!(Direction::between(3, 4), Some(Direction::Right));
        assert_eq!(Direction::between(4, 3), Some(Direction::Left));
    }

    #[test]
    fn test_long_jump_classified_by_sign() {
        assert_eq!(Direction::between(0, 37), Some(Direction::Down));
        assert_eq!(Direction::between(37, 2), Some(Direction::Up));
    }

    #[test]
    fn test_direction_step() {
        assert_eq!(Direction::Right.step(3, 4, 10), Some(4));
        assert_eq!(Direction::Down.step(3, 4, 10), Some(7));
        assert_eq!(Direction::Down.step(7, 4, 10), None);
        assert_eq!(Direction::Up.step(2, 4, 10), None);
        assert_eq!(Direction::Left.step(0, 4, 10), None);
        assert_eq!(Direction::None.step(5, 4, 10), Some(5));
    }

    #[test]
    fn test_step_then_classify_round_trip() {
        // Moving down a row is classified as Down, one step as Right
        let down = Direction::Down.step(1, 4, 20).unwrap();
        assert_eq!(Direction::between(1, down), Some(Direction::Down));
        let right = Direction::Right.step(3, 4, 20).unwrap();
        assert_eq!(Direction::between(3, right), Some(Direction::Right));
    }

    #[test]
    fn test_symmetric_window() {
        let window = Window::around(&config(5), 50, Direction::None, 1000);
        assert_eq!((window.low, window.high), (45, 55));
        assert_eq!(window.len(), 11);
        assert_eq!(window.ahead(), window.behind());
    }

    #[test]
    fn test_forward_window_leans_ahead() {
        let window = Window::around(&config(5), 50, Direction::Right, 1000);
        assert_eq!((window.low, window.high), (48, 58));
        assert_eq!(window.ahead(), 8);
        assert_eq!(window.behind(), 2);

        let down = Window::around(&config(5), 50, Direction::Down, 1000);
        assert_eq!((down.low, down.high), (48, 58));
    }

    #[test]
    fn test_backward_window_leans_behind() {
        let window = Window::around(&config(5), 50, Direction::Left, 1000);
        assert_eq!((window.low, window.high), (42, 52));

        let up = Window::around(&config(5), 50, Direction::Up, 1000);
        assert_eq!((up.low, up.high), (42, 52));
    }

    #[test]
    fn test_window_clamped_at_edges() {
        let window = Window::around(&config(1), 0, Direction::None, 3);
        assert_eq!((window.low, window.high), (0, 1));

        let window = Window::around(&config(5), 998, Direction::Right, 1000);
        assert_eq!((window.low, window.high), (996, 999));
        assert!(window.len() <= config(5).max_width());
    }

    #[test]
    fn test_empty_collection() {
        let window = Window::around(&config(5), 0, Direction::None, 0);
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        assert_eq!(window.indices().count(), 0);
        assert!(!window.contains(0));
    }

    #[test]
    fn test_window_contains() {
        let window = Window::around(&config(2), 10, Direction::None, 100);
        assert!(window.contains(8));
        assert!(window.contains(12));
        assert!(!window.contains(7));
        assert!(!window.contains(13));
        assert_eq!(window.indices().collect::<Vec<_>>(), vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_tracker_first_move_is_undirected() {
        let mut tracker = WindowTracker::new(config(5));
        let window = tracker.on_cursor_move(50, 1000);
        assert_eq!(window.direction, Direction::None);
        assert_eq!(tracker.cursor(), Some(50));
    }

    #[test]
    fn test_tracker_repeated_right_moves() {
        let mut tracker = WindowTracker::new(config(5));
        tracker.on_cursor_move(49, 1000);

        for cursor in 50..60 {
            let window = tracker.on_cursor_move(cursor, 1000);
            assert_eq!(window.direction, Direction::Right);
            assert!(window.ahead() > window.behind());
            assert_eq!(window.high, cursor + 8);
        }
    }

    #[test]
    fn test_tracker_same_index_keeps_direction() {
        let mut tracker = WindowTracker::new(config(5));
        tracker.on_cursor_move(10, 100);
        tracker.on_cursor_move(14, 100);
        let window = tracker.on_cursor_move(14, 100);
        assert_eq!(window.direction, Direction::Down);
    }

    #[test]
    fn test_tracker_refocus_is_symmetric() {
        let mut tracker = WindowTracker::new(config(5));
        tracker.on_cursor_move(49, 1000);
        tracker.on_cursor_move(50, 1000);

        let window = tracker.refocus(1000);
        assert_eq!(window.direction, Direction::None);
        assert_eq!((window.low, window.high), (45, 55));
        assert_eq!(tracker.direction(), Direction::None);
    }

    #[test]
    fn test_tracker_empty_collection_resets() {
        let mut tracker = WindowTracker::new(config(5));
        tracker.on_cursor_move(3, 10);

        let window = tracker.on_cursor_move(0, 0);
        assert!(window.is_empty());
        assert_eq!(tracker.cursor(), None);
        assert!(tracker.refocus(0).is_empty());
    }

    #[test]
    fn test_tracker_reset() {
        let mut tracker = WindowTracker::new(config(5));
        tracker.on_cursor_move(3, 10);
        tracker.on_cursor_move(4, 10);
        tracker.reset();

        assert_eq!(tracker.cursor(), None);
        let window = tracker.on_cursor_move(5, 10);
        assert_eq!(window.direction, Direction::None);
    }
}
