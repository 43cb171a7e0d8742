//! Engine error taxonomy

use crate::session::TrackId;
use stemdeck_grid::GridError;
use stemdeck_media::MediaError;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Readiness timeouts are deliberately absent: they degrade to
/// best-effort continuation and are reported as non-fatal warnings on
/// the event stream, never as errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The host playback policy refused play(); the session stays paused
    #[error("playback rejected by host policy")]
    PlaybackRejected,
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),
    #[error("no tracks loaded")]
    NoTracks,
    /// Grid update rejected; the prior grid value is retained
    #[error(transparent)]
    Grid(#[from] GridError),
    /// Export selection failed validation
    #[error("invalid selection {start}..{end}")]
    InvalidSelection { start: f64, end: f64 },
    #[error("media source failed: {0}")]
    Source(String),
}

impl From<MediaError> for EngineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::PlaybackRejected => EngineError::PlaybackRejected,
            MediaError::SourceFailed(src) => EngineError::Source(src),
        }
    }
}
