//! Waveform visuals for stemdeck
//!
//! One visual surface per track: downsampled amplitude peaks with
//! dominant-band tagging for rendering, a zoomable viewport whose zoom
//! changes preserve the centered time, and a derived playback cursor
//! that is never authoritative over the transport.

mod peaks;
mod surface;
mod viewport;

pub use peaks::{Band, PeakAnalyzer, PeakPoint, WaveformPeaks};
pub use surface::{SurfaceEvent, WaveformSurface};
pub use viewport::{Viewport, ZOOM_MAX, ZOOM_MIN};
