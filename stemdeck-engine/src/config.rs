//! Engine tunables
//!
//! Session-scoped; the engine persists nothing, so there is no config
//! file. The struct keeps every bounded-wait constant in one place and
//! lets hosts tune them without recompiling.

/// Tunables for one [`crate::Player`](crate::Player) instance
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Bounded wait for a handed-off element to report usable metadata
    pub metadata_timeout: f64,
    /// Bounded wait for a seek to be acknowledged
    pub seek_ack_timeout: f64,
    /// Loop boundary tolerance, masks natural scheduling jitter
    pub loop_epsilon: f64,
    /// Minimum interval between drag position updates (~one frame)
    pub drag_throttle: f64,
    /// Columns in each track's peak table
    pub peak_columns: usize,
    /// Initial viewport width for every waveform surface, in pixels
    pub viewport_width: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            metadata_timeout: 1.5,
            seek_ack_timeout: 0.3,
            loop_epsilon: 0.02,
            drag_throttle: 0.016,
            peak_columns: 1000,
            viewport_width: 800.0,
        }
    }
}
