//! The media handle contract shared by all playback elements

use thiserror::Error;

/// Errors surfaced by a media element
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The host playback policy refused a programmatic play() call.
    /// The caller must leave the transport paused and wait for a gesture.
    #[error("playback rejected by host policy")]
    PlaybackRejected,
    /// The underlying source failed to load or decode
    #[error("media source failed: {0}")]
    SourceFailed(String),
}

/// Readiness of a media element's underlying source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    /// No source attached yet
    #[default]
    Empty,
    /// Source attached, metadata not yet available
    Loading,
    /// Duration and seeking are usable
    HaveMetadata,
    /// Source failed; the element will never become ready
    Failed,
}

impl ReadyState {
    /// Whether the element can be seeked and its duration trusted
    pub fn has_metadata(self) -> bool {
        matches!(self, ReadyState::HaveMetadata)
    }
}

/// One playback handle. The engine treats these as interchangeable clocks:
/// exactly one element at a time is unmuted and trusted as the timing
/// source; the rest follow it.
///
/// Readiness and seeking are asynchronous: after `set_current_time` the
/// element reports `seek_in_flight()` until the position is acknowledged.
/// Callers must bound their waits; acknowledgement is never guaranteed.
pub trait MediaElement {
    /// Begin playback. May be rejected by the host playback policy
    /// (`MediaError::PlaybackRejected`), in which case the element
    /// remains paused.
    fn play(&mut self) -> Result<(), MediaError>;

    /// Pause playback. Always succeeds; position is retained.
    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Request a seek. Only meaningful once metadata is available; the
    /// seek completes asynchronously (`seek_in_flight`).
    fn set_current_time(&mut self, seconds: f64);

    /// Duration in seconds, once metadata is available
    fn duration(&self) -> Option<f64>;

    fn ready_state(&self) -> ReadyState;

    /// True while a requested seek has not yet been acknowledged
    fn seek_in_flight(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Set output gain, clamped to 0.0..=1.0
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;
}
