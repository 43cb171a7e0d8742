//! One track's waveform surface: peaks + viewport + derived cursor

use crate::peaks::{PeakPoint, WaveformPeaks};
use crate::viewport::Viewport;
use tracing::trace;

/// Events a surface emits toward the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// Peaks are loaded and the duration is known
    Ready { duration: f64 },
    /// A user interaction requested a seek, as normalized progress.
    /// Programmatic cursor updates never produce this.
    Seek { progress: f64 },
    /// Zoom/resize finished; overlays and grid lines need repositioning
    Redraw,
}

/// Visual surface for a single track.
///
/// The cursor is derived state: it is recomputed from the authoritative
/// transport position except while this surface's own drag is active.
#[derive(Debug)]
pub struct WaveformSurface {
    peaks: WaveformPeaks,
    viewport: Viewport,
    /// Normalized playback position, 0.0..=1.0
    cursor: f64,
    dragging: bool,
    ready: bool,
    pending: Vec<SurfaceEvent>,
}

impl WaveformSurface {
    pub fn new(viewport_width: f64) -> Self {
        Self {
            peaks: WaveformPeaks::default(),
            viewport: Viewport::new(viewport_width),
            cursor: 0.0,
            dragging: false,
            ready: false,
            pending: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn duration(&self) -> f64 {
        self.peaks.duration_seconds
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn peaks(&self) -> &WaveformPeaks {
        &self.peaks
    }

    /// Drain events accumulated since the last call
    pub fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Attach the peak table produced for this track's audio
    pub fn set_peaks(&mut self, peaks: WaveformPeaks) {
        let duration = peaks.duration_seconds;
        self.peaks = peaks;
        self.ready = duration > 0.0;
        if self.ready {
            self.pending.push(SurfaceEvent::Ready { duration });
        }
    }

    /// Programmatic cursor update from the authoritative position.
    /// Ignored while this surface's own drag is active.
    pub fn set_cursor(&mut self, progress: f64) {
        if !self.dragging {
            self.cursor = progress.clamp(0.0, 1.0);
        }
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Drag end; the surface resumes following the transport
    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// A pointer interaction at a viewport-relative x position. Emits a
    /// Seek event with the normalized progress under the pointer.
    pub fn pointer_seek(&mut self, x_in_viewport: f64) -> f64 {
        let content = self.viewport.content_width();
        let px = (self.viewport.scroll_left() + x_in_viewport).clamp(0.0, content);
        let progress = if content > 0.0 { px / content } else { 0.0 };
        trace!(progress, "pointer seek on surface");
        self.pending.push(SurfaceEvent::Seek { progress });
        progress
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom, self.duration());
        self.pending.push(SurfaceEvent::Redraw);
    }

    pub fn zoom_about(&mut self, zoom: f64, center_time: f64) {
        self.viewport.zoom_about(zoom, center_time, self.duration());
        self.pending.push(SurfaceEvent::Redraw);
    }

    pub fn resize(&mut self, viewport_width: f64) {
        self.viewport.resize(viewport_width, self.duration());
        self.pending.push(SurfaceEvent::Redraw);
    }

    /// Viewport-relative pixel of an absolute time, None when the time
    /// is scrolled out of view. Used to position grid lines and markers.
    pub fn overlay_px(&self, t: f64) -> Option<f64> {
        let px = self.viewport.time_to_px(t, self.duration()) - self.viewport.scroll_left();
        (px >= 0.0 && px <= self.viewport.viewport_width()).then_some(px)
    }

    /// Resample the visible time range into `columns` peak columns
    pub fn visible_columns(&self, columns: usize) -> Vec<PeakPoint> {
        if columns == 0 || self.peaks.is_empty() {
            return Vec::new();
        }
        let content = self.viewport.content_width();
        let start = self.viewport.scroll_left() / content;
        let span = self.viewport.viewport_width() / content;
        (0..columns)
            .map(|c| {
                let progress = start + span * (c as f64 + 0.5) / columns as f64;
                self.peaks.point_at(progress).unwrap_or_default()
            })
            .collect()
    }
}
