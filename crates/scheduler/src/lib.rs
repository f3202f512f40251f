//! Thumbgrid Scheduler Library
//!
//! Backend-free decisions for windowed asset loading in a scrollable grid.
//!
//! This crate decides *which* item indices should have their assets resident
//! and in *what order* they should be loaded. A [`WindowTracker`] follows the
//! cursor and produces a [`Window`] that leans toward the direction of travel;
//! [`load_order`] ranks the window's indices by distance from the cursor;
//! [`LoadCadence`] lets a frame loop spread load steps over several frames.
//!
//! # Example
//!
//! ```
//! use thumbgrid_scheduler::{load_order, WindowConfig, WindowTracker};
//!
//! let mut tracker = WindowTracker::new(WindowConfig::new(1, 0.6, 4));
//!
//! // Three items, cursor placed on the first one
//! let window = tracker.on_cursor_move(0, 3);
//! assert_eq!((window.low, window.high), (0, 1));
//! assert_eq!(load_order(&window), vec![0, 1]);
//! ```

mod cadence;
mod priority;
mod window;

// Re-export public API
pub use cadence::LoadCadence;
pub use priority::{load_order, LoadPriority};
pub use window::{Direction, Window, WindowConfig, WindowTracker};
