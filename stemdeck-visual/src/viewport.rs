//! Zoomable viewport math for a waveform surface

/// Minimum zoom factor (whole track fits the viewport)
pub const ZOOM_MIN: f64 = 1.0;
/// Maximum zoom factor
pub const ZOOM_MAX: f64 = 12.0;

/// Horizontal viewport over a waveform's content strip.
///
/// Content width is `viewport_width * zoom`; `scroll_left` is the pixel
/// offset of the viewport's left edge into the content, always clamped
/// to `[0, content_width - viewport_width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    viewport_width: f64,
    zoom: f64,
    scroll_left: f64,
}

impl Viewport {
    pub fn new(viewport_width: f64) -> Self {
        Self {
            viewport_width: viewport_width.max(1.0),
            zoom: ZOOM_MIN,
            scroll_left: 0.0,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn content_width(&self) -> f64 {
        self.viewport_width * self.zoom
    }

    pub fn scroll_left(&self) -> f64 {
        self.scroll_left
    }

    fn max_scroll(&self) -> f64 {
        (self.content_width() - self.viewport_width).max(0.0)
    }

    pub fn set_scroll(&mut self, scroll_left: f64) {
        self.scroll_left = scroll_left.clamp(0.0, self.max_scroll());
    }

    /// Pixel position of a time within the content strip
    pub fn time_to_px(&self, t: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 0.0;
        }
        (t / duration).clamp(0.0, 1.0) * self.content_width()
    }

    /// Time at a pixel position within the content strip
    pub fn px_to_time(&self, px: f64, duration: f64) -> f64 {
        let content = self.content_width();
        if content <= 0.0 {
            return 0.0;
        }
        (px / content).clamp(0.0, 1.0) * duration
    }

    /// Time currently under the viewport's center
    pub fn center_time(&self, duration: f64) -> f64 {
        self.px_to_time(self.scroll_left + self.viewport_width / 2.0, duration)
    }

    /// Change zoom, keeping `center_time` under the viewport's center.
    /// The new scroll offset is clamped to the content.
    pub fn zoom_about(&mut self, zoom: f64, center_time: f64, duration: f64) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        let target_center_px = self.time_to_px(center_time, duration);
        self.scroll_left =
            (target_center_px - self.viewport_width / 2.0).clamp(0.0, self.max_scroll());
    }

    /// Change zoom, preserving whatever time is currently centered
    pub fn set_zoom(&mut self, zoom: f64, duration: f64) {
        let center = self.center_time(duration);
        self.zoom_about(zoom, center, duration);
    }

    /// The host resized the surface; content and scroll rescale so the
    /// centered time stays centered.
    pub fn resize(&mut self, viewport_width: f64, duration: f64) {
        let center = self.center_time(duration);
        self.viewport_width = viewport_width.max(1.0);
        self.zoom_about(self.zoom, center, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_preserves_viewport_center() {
        // duration 40s, viewport 800px; zooming to 4x about t=10s puts
        // the target center at px 800 and the scroll at 400
        let mut vp = Viewport::new(800.0);
        vp.zoom_about(4.0, 10.0, 40.0);
        assert_eq!(vp.content_width(), 3200.0);
        assert_eq!(vp.scroll_left(), 400.0);
    }

    #[test]
    fn scroll_clamps_to_content() {
        let mut vp = Viewport::new(800.0);
        vp.zoom_about(4.0, 40.0, 40.0); // center on the very end
        assert_eq!(vp.scroll_left(), 2400.0); // content - viewport
        vp.zoom_about(4.0, 0.0, 40.0);
        assert_eq!(vp.scroll_left(), 0.0);
    }

    #[test]
    fn zoom_factor_is_bounded() {
        let mut vp = Viewport::new(800.0);
        vp.set_zoom(50.0, 40.0);
        assert_eq!(vp.zoom(), ZOOM_MAX);
        vp.set_zoom(0.1, 40.0);
        assert_eq!(vp.zoom(), ZOOM_MIN);
    }

    #[test]
    fn unzoomed_viewport_never_scrolls() {
        let mut vp = Viewport::new(800.0);
        vp.set_scroll(300.0);
        assert_eq!(vp.scroll_left(), 0.0);
    }

    #[test]
    fn px_time_round_trip() {
        let mut vp = Viewport::new(800.0);
        vp.set_zoom(2.0, 40.0);
        let px = vp.time_to_px(12.5, 40.0);
        assert!((vp.px_to_time(px, 40.0) - 12.5).abs() < 1e-9);
    }
}
