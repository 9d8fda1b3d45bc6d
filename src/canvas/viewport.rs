use crate::config::ViewportConfig;
use crate::geometry::Rect;

/// Pan and zoom of the canvas view: `screen = canvas * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan: (f32, f32),
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: (0.0, 0.0),
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen_to_canvas(&self, point: (f32, f32)) -> (f32, f32) {
        (
            (point.0 - self.pan.0) / self.zoom,
            (point.1 - self.pan.1) / self.zoom,
        )
    }

    pub fn canvas_to_screen(&self, point: (f32, f32)) -> (f32, f32) {
        (
            point.0 * self.zoom + self.pan.0,
            point.1 * self.zoom + self.pan.1,
        )
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    /// Multiply the zoom by `factor` (clamped) keeping the canvas point under
    /// `anchor` fixed on screen.
    pub fn zoom_at(&mut self, anchor: (f32, f32), factor: f32, config: &ViewportConfig) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let before = self.screen_to_canvas(anchor);
        self.zoom = (self.zoom * factor).clamp(config.min_zoom, config.max_zoom);
        self.pan = (
            anchor.0 - before.0 * self.zoom,
            anchor.1 - before.1 * self.zoom,
        );
    }

    pub fn zoom_in(&mut self, anchor: (f32, f32), config: &ViewportConfig) {
        self.zoom_at(anchor, config.zoom_step, config);
    }

    pub fn zoom_out(&mut self, anchor: (f32, f32), config: &ViewportConfig) {
        self.zoom_at(anchor, 1.0 / config.zoom_step, config);
    }

    /// Zoom and pan so `bounds` fills a `size` screen with `padding` on
    /// every side, centred.
    pub fn fit_to(&mut self, bounds: &Rect, size: (f32, f32), padding: f32, config: &ViewportConfig) {
        let avail_w = (size.0 - padding * 2.0).max(1.0);
        let avail_h = (size.1 - padding * 2.0).max(1.0);
        let zoom = if bounds.width > 0.0 && bounds.height > 0.0 {
            (avail_w / bounds.width).min(avail_h / bounds.height)
        } else {
            1.0
        };
        self.zoom = zoom.clamp(config.min_zoom, config.max_zoom);
        let (cx, cy) = bounds.center();
        self.pan = (
            size.0 / 2.0 - cx * self.zoom,
            size.1 / 2.0 - cy * self.zoom,
        );
    }
}
