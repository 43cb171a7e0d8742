//! Beat grid state and snapping math

use thiserror::Error;
use tracing::debug;

/// Lowest accepted BPM
pub const BPM_MIN: f64 = 20.0;
/// Highest accepted BPM
pub const BPM_MAX: f64 = 300.0;

/// Errors from rejected grid parameter updates. The grid retains its
/// prior value whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("bpm {0:.1} outside {BPM_MIN}..{BPM_MAX}")]
    BpmOutOfRange(f64),
    #[error("beats per bar must be at least 1")]
    InvalidBarLength,
    #[error("drag produced a degenerate grid")]
    DegenerateDrag,
}

/// One rendered grid line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    /// Absolute time of the line in seconds
    pub time: f64,
    /// True when the line starts a bar
    pub is_bar: bool,
}

/// Musical beat grid for one track: BPM, bar length, and phase offset.
///
/// Session-scoped; nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    bpm: f64,
    beats_per_bar: u32,
    offset_seconds: f64,
    enabled: bool,
}

impl Default for BeatGrid {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beats_per_bar: 4,
            offset_seconds: 0.0,
            enabled: false,
        }
    }
}

impl BeatGrid {
    /// Minimum beat-duration change accepted from a drag, to suppress
    /// jitter from sub-pixel mouse movement: max(0.5ms, 0.5% of current)
    fn drag_noise_threshold(&self) -> f64 {
        (0.0005f64).max(0.005 * self.beat_duration())
    }

    pub fn new(bpm: f64, beats_per_bar: u32, offset_seconds: f64) -> Result<Self, GridError> {
        let mut grid = Self::default();
        grid.set_bpm(bpm)?;
        grid.set_beats_per_bar(beats_per_bar)?;
        grid.offset_seconds = offset_seconds.max(0.0);
        Ok(grid)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn offset_seconds(&self) -> f64 {
        self.offset_seconds
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Seconds per beat
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Seconds per bar
    pub fn bar_duration(&self) -> f64 {
        self.beat_duration() * self.beats_per_bar as f64
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), GridError> {
        if !(BPM_MIN..=BPM_MAX).contains(&bpm) || !bpm.is_finite() {
            return Err(GridError::BpmOutOfRange(bpm));
        }
        self.bpm = bpm;
        Ok(())
    }

    pub fn set_beats_per_bar(&mut self, beats: u32) -> Result<(), GridError> {
        if beats == 0 {
            return Err(GridError::InvalidBarLength);
        }
        self.beats_per_bar = beats;
        Ok(())
    }

    /// Set the phase offset directly (start-handle drag), clamped to the
    /// track. Does not alter BPM.
    pub fn set_offset(&mut self, seconds: f64, duration: f64) {
        self.offset_seconds = seconds.clamp(0.0, duration.max(0.0));
    }

    /// Quantize a time to the nearest grid line, clamped to the track.
    /// Identity when the grid is disabled. Idempotent.
    pub fn snap_time(&self, t: f64, duration: f64) -> f64 {
        if !self.enabled {
            return t.clamp(0.0, duration);
        }
        let beat = self.beat_duration();
        let n = ((t - self.offset_seconds) / beat).round();
        (self.offset_seconds + n * beat).clamp(0.0, duration)
    }

    /// Generate all grid lines inside the track, bar lines marked
    pub fn lines(&self, duration: f64) -> Vec<GridLine> {
        let beat = self.beat_duration();
        if duration < self.offset_seconds || beat <= 0.0 {
            return Vec::new();
        }
        let count = ((duration - self.offset_seconds) / beat).floor() as u64;
        (0..=count)
            .map(|n| GridLine {
                time: self.offset_seconds + n as f64 * beat,
                is_bar: n % self.beats_per_bar as u64 == 0,
            })
            .collect()
    }

    /// Infer a new BPM from dragging the bar handle `bars_from_offset`
    /// bars past the offset to absolute time `dragged_to`.
    ///
    /// Rejected when the implied BPM leaves the valid range or the change
    /// is below the noise threshold; accepted BPM is rounded to 0.1.
    pub fn drag_bar_handle(&mut self, bars_from_offset: u32, dragged_to: f64) -> Result<(), GridError> {
        if bars_from_offset == 0 {
            return Err(GridError::DegenerateDrag);
        }
        let bar_duration = (dragged_to - self.offset_seconds) / bars_from_offset as f64;
        let new_beat = bar_duration / self.beats_per_bar as f64;
        if !new_beat.is_finite() || new_beat <= 0.0 {
            return Err(GridError::DegenerateDrag);
        }
        if (new_beat - self.beat_duration()).abs() < self.drag_noise_threshold() {
            return Err(GridError::DegenerateDrag);
        }
        let implied_bpm = 60.0 / new_beat;
        if !(BPM_MIN..=BPM_MAX).contains(&implied_bpm) {
            debug!(implied_bpm, "bar-handle drag rejected, bpm out of range");
            return Err(GridError::BpmOutOfRange(implied_bpm));
        }
        self.bpm = (implied_bpm * 10.0).round() / 10.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(bpm: f64) -> BeatGrid {
        let mut g = BeatGrid::new(bpm, 4, 0.0).unwrap();
        g.set_enabled(true);
        g
    }

    #[test]
    fn snap_rounds_to_nearest_beat() {
        let g = grid(120.0); // beat = 0.5s
        assert_eq!(g.snap_time(1.3, 40.0), 1.5);
        assert_eq!(g.snap_time(1.2, 40.0), 1.0);
    }

    #[test]
    fn snap_is_idempotent() {
        let mut g = grid(97.3);
        g.set_offset(0.137, 300.0);
        for &t in &[0.0, 1.3, 17.77, 123.456, 299.9] {
            let once = g.snap_time(t, 300.0);
            assert_eq!(g.snap_time(once, 300.0), once);
        }
    }

    #[test]
    fn snap_respects_offset_and_clamps() {
        let mut g = grid(120.0);
        g.set_offset(0.2, 10.0);
        assert!((g.snap_time(0.9, 10.0) - 0.7).abs() < 1e-9);
        assert_eq!(g.snap_time(-5.0, 10.0), 0.0);
        assert_eq!(g.snap_time(50.0, 10.0), 10.0);
    }

    #[test]
    fn disabled_grid_snaps_to_identity() {
        let mut g = grid(120.0);
        g.set_enabled(false);
        assert_eq!(g.snap_time(1.3, 40.0), 1.3);
    }

    #[test]
    fn lines_mark_bars() {
        let g = grid(120.0); // beat = 0.5s, bar every 2.0s
        let lines = g.lines(4.0);
        assert_eq!(lines.len(), 9); // n = 0..=8
        assert!(lines[0].is_bar);
        assert!(!lines[1].is_bar);
        assert!(lines[4].is_bar);
        assert!((lines[8].time - 4.0).abs() < 1e-9);
    }

    #[test]
    fn bpm_out_of_range_is_rejected() {
        let mut g = grid(120.0);
        assert!(g.set_bpm(19.9).is_err());
        assert!(g.set_bpm(300.1).is_err());
        assert_eq!(g.bpm(), 120.0);
    }

    #[test]
    fn drag_bar_handle_updates_bpm() {
        let mut g = grid(120.0);
        // Bar 1 dragged to 2.4s -> bar = 2.4s, beat = 0.6s -> 100 BPM
        g.drag_bar_handle(1, 2.4).unwrap();
        assert_eq!(g.bpm(), 100.0);
    }

    #[test]
    fn drag_implying_out_of_range_bpm_is_rejected() {
        let mut g = grid(120.0);
        // Bar 1 dragged so one bar lasts 4 beats of 310 BPM
        let bar = 4.0 * 60.0 / 310.0;
        assert!(matches!(
            g.drag_bar_handle(1, bar),
            Err(GridError::BpmOutOfRange(_))
        ));
        assert_eq!(g.bpm(), 120.0);
    }

    #[test]
    fn sub_threshold_drag_is_rejected_as_jitter() {
        let mut g = grid(120.0);
        // 0.01% change in beat duration, well under the 0.5% threshold
        let bar = 4.0 * 0.5 * 1.0001;
        assert_eq!(g.drag_bar_handle(1, bar), Err(GridError::DegenerateDrag));
        assert_eq!(g.bpm(), 120.0);
    }

    #[test]
    fn offset_drag_leaves_bpm_alone() {
        let mut g = grid(120.0);
        g.set_offset(3.7, 40.0);
        assert_eq!(g.offset_seconds(), 3.7);
        assert_eq!(g.bpm(), 120.0);
        g.set_offset(99.0, 40.0);
        assert_eq!(g.offset_seconds(), 40.0);
    }
}
