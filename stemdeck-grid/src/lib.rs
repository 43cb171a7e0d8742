//! Beat grid model for stemdeck
//!
//! BPM, bar length, and phase offset for a loaded track, plus the math
//! built on them: quantizing times to grid lines, generating lines for
//! rendering, and inferring BPM from tap timestamps or from dragging a
//! bar handle on a waveform.
//!
//! The grid never analyzes audio content; BPM is supplied, tapped, or
//! adjusted by hand.

mod beatgrid;
mod tap;

pub use beatgrid::{BeatGrid, GridError, GridLine, BPM_MAX, BPM_MIN};
pub use tap::TapTempo;
