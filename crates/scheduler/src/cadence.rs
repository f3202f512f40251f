//! Frame cadence for incremental loading
//!
//! The load scheduler does one bounded step per `tick()`. Slow targets can
//! spread that work further by ticking only every N frames; this tracker
//! lives in the frame loop, so the cache itself never counts frames.
//!
//! # Target Frame Times
//! - 60 FPS, `ticks_per_load = 1`: one load step per 16.67ms frame
//! - 60 FPS, `ticks_per_load = 4`: one load step every ~67ms

/// Decides on which frames the loader should tick
///
/// # Example
///
/// ```
/// use thumbgrid_scheduler::LoadCadence;
///
/// let mut cadence = LoadCadence::new(3);
/// let ticks: Vec<bool> = (0..6).map(|_| cadence.advance()).collect();
/// assert_eq!(ticks, vec![true, false, false, true, false, false]);
/// ```
#[derive(Debug, Clone)]
pub struct LoadCadence {
    /// Frames between two ticks
    ticks_per_load: u32,

    /// Frames seen since the last tick
    frames_since_tick: u32,

    /// Total frames seen
    frames: u64,

    /// Total ticks granted
    ticks: u64,
}

impl LoadCadence {
    /// Create a cadence that ticks every `ticks_per_load` frames.
    ///
    /// A value of zero is treated as one.
    pub fn new(ticks_per_load: u32) -> Self {
        Self {
            ticks_per_load: ticks_per_load.max(1),
            // First frame ticks immediately
            frames_since_tick: ticks_per_load.max(1) - 1,
            frames: 0,
            ticks: 0,
        }
    }

    /// Advance one frame. Returns `true` if the loader should tick now.
    pub fn advance(&mut self) -> bool {
        self.frames += 1;
        self.frames_since_tick += 1;
        if self.frames_since_tick >= self.ticks_per_load {
            self.frames_since_tick = 0;
            self.ticks += 1;
            true
        } else {
            false
        }
    }

    /// Make the next frame tick regardless of the cadence.
    ///
    /// Used after a cursor move so eviction of the old window happens on the
    /// very next frame.
    pub fn hurry(&mut self) {
        self.frames_since_tick = self.ticks_per_load - 1;
    }

    /// Frames between ticks
    pub fn ticks_per_load(&self) -> u32 {
        self.ticks_per_load
    }

    /// Total frames advanced
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Total ticks granted
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for LoadCadence {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_frame() {
        let mut cadence = LoadCadence::new(1);
        assert!((0..10).all(|_| cadence.advance()));
        assert_eq!(cadence.frames(), 10);
        assert_eq!(cadence.ticks(), 10);
    }

    #[test]
    fn test_every_third_frame() {
        let mut cadence = LoadCadence::new(3);
        let granted = (0..9).filter(|_| cadence.advance()).count();
        assert_eq!(granted, 3);
        assert_eq!(cadence.frames(), 9);
    }

    #[test]
    fn test_zero_is_one() {
        let cadence = LoadCadence::new(0);
        assert_eq!(cadence.ticks_per_load(), 1);
    }

    #[test]
    fn test_hurry() {
        let mut cadence = LoadCadence::new(4);
        assert!(cadence.advance());
        assert!(!cadence.advance());

        cadence.hurry();
        assert!(cadence.advance());
        assert!(!cadence.advance());
    }

    #[test]
    fn test_default() {
        let cadence = LoadCadence::default();
        assert_eq!(cadence.ticks_per_load(), 1);
    }
}
