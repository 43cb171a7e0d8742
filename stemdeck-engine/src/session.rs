//! The authoritative playback session
//!
//! Exactly one instance exists per mounted player. Only the Transport
//! Controller and the Seek Arbiter write `current_time` and
//! `active_track`; every other component reads and follows.

use std::fmt;

/// Stable host-supplied track identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Drag state of the shared transport position
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        /// Track whose surface originated the drag
        origin: TrackId,
        /// Position under the pointer; audio is untouched until the
        /// drag ends and this folds into `current_time`
        provisional_time: f64,
    },
}

/// The single authoritative transport state shared by all tracks
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    /// Logical playback position, always within [0, duration]
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    /// The one track whose element is unmuted and trusted as the clock
    pub active_track: TrackId,
    pub drag: DragState,
}

impl PlaybackSession {
    pub fn new(active_track: TrackId) -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            active_track,
            drag: DragState::Idle,
        }
    }

    /// Clamp a time into the session's valid range
    pub fn clamp(&self, t: f64) -> f64 {
        t.clamp(0.0, self.duration.max(0.0))
    }

    /// Normalized progress of a time against the session duration
    pub fn progress(&self, t: f64) -> f64 {
        if self.duration > 0.0 {
            (t / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }
}
