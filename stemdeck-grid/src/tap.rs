//! Tap tempo inference from a rolling window of tap timestamps

use crate::beatgrid::{BPM_MAX, BPM_MIN};
use tracing::debug;

/// Trailing window within which taps count toward the estimate
const TAP_WINDOW_SECONDS: f64 = 2.5;

/// Rolling tap-tempo estimator.
///
/// Timestamps come from the host's monotonic clock in seconds. Taps older
/// than the trailing window are discarded; with two or more surviving
/// taps, BPM is the reciprocal of the mean consecutive interval.
#[derive(Debug, Default)]
pub struct TapTempo {
    taps: Vec<f64>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at `now`. Returns the inferred BPM when at least
    /// two taps fall inside the window and the result is in range.
    pub fn tap(&mut self, now: f64) -> Option<f64> {
        self.taps.retain(|&t| now - t <= TAP_WINDOW_SECONDS);
        self.taps.push(now);

        if self.taps.len() < 2 {
            return None;
        }

        let intervals = self.taps.len() - 1;
        let mean = (self.taps[intervals] - self.taps[0]) / intervals as f64;
        if mean <= 0.0 {
            return None;
        }

        let bpm = 60.0 / mean;
        if (BPM_MIN..=BPM_MAX).contains(&bpm) {
            Some(bpm)
        } else {
            debug!(bpm, "tap tempo outside accepted range, ignored");
            None
        }
    }

    /// Drop all recorded taps
    pub fn reset(&mut self) {
        self.taps.clear();
    }
}
