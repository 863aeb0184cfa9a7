//! Camera module for the pan/zoom view transform.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Allowed zoom range.
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// Camera manages the view transform for one open canvas.
///
/// Screen coordinates are relative to the viewport element; world
/// coordinates are the space layer surfaces live in. The mapping pivots
/// on the viewport center so a freshly opened canvas sits centered
/// regardless of zoom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan).
    pub pan: Vec2,
    /// Current zoom level.
    pub zoom: f64,
    /// Viewport size in screen pixels.
    pub viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl Camera {
    pub fn new(viewport: Size) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            viewport,
        }
    }

    fn center(&self) -> Vec2 {
        Vec2::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    /// Affine converting world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan + self.center())
            * Affine::scale(self.zoom)
            * Affine::translate(-self.center())
    }

    /// Affine converting screen coordinates to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::translate(self.center())
            * Affine::scale(1.0 / self.zoom)
            * Affine::translate(-self.pan - self.center())
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Set the zoom level, clamped to [0.1, 10].
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom to a new level keeping `world_anchor` visually fixed.
    ///
    /// The pan correction is `pan - anchor * (new - old)` with the
    /// anchor taken relative to the viewport center.
    pub fn zoom_at(&mut self, world_anchor: Point, new_zoom: f64) {
        let new_zoom = new_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let anchor = world_anchor - self.center().to_point();
        self.pan -= anchor * (new_zoom - self.zoom);
        self.zoom = new_zoom;
    }

    /// Reset to the default position and zoom.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Fit the view to show `bounds` with a margin on every side.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }
        let padded = Size::new(
            (self.viewport.width - padding * 2.0).max(1.0),
            (self.viewport.height - padding * 2.0).max(1.0),
        );
        let scale_x = padded.width / bounds.width();
        let scale_y = padded.height / bounds.height();
        self.zoom = scale_x.min(scale_y).clamp(MIN_ZOOM, MAX_ZOOM);

        let offset = bounds.center() - self.center().to_point();
        self.pan = -offset * self.zoom;
    }
}
