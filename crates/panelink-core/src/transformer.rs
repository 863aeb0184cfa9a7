//! Layer transform gizmo.
//!
//! The gizmo manipulates a layer's sprite transform (move, resize,
//! rotate) without touching the layer's stroke log. Visual transforms
//! and stroke data are independent; replay always reproduces the
//! untransformed pixels.

use crate::stroke::LayerId;
use crate::surface::CanvasSurfaces;
use kurbo::{Point, Rect, Vec2};

/// Fallback box size for layers with no recorded content extent.
pub const DEFAULT_BOX_SIZE: f64 = 100.0;

/// Distance of the rotate handle above the top edge, in world pixels.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;

/// Handle hit tolerance in world pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// A manipulation handle on the gizmo box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GizmoHandle {
    Corner(Corner),
    Edge(Edge),
    Rotate,
}

/// Gizmo lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GizmoState {
    Inactive,
    Active,
    Dragging,
    Resizing(GizmoHandle),
    Rotating,
}

/// Interactive resize/rotate box over a single selected layer.
pub struct TransformGizmo {
    state: GizmoState,
    layer: Option<LayerId>,
    /// Unrotated working box.
    bounds: Rect,
    /// Content rect captured at activation; the commit pivot.
    content: Rect,
    /// Rotation in degrees.
    rotation: f64,
    last_pointer: Point,
}

impl Default for TransformGizmo {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformGizmo {
    pub fn new() -> Self {
        Self {
            state: GizmoState::Inactive,
            layer: None,
            bounds: Rect::ZERO,
            content: Rect::ZERO,
            rotation: 0.0,
            last_pointer: Point::ZERO,
        }
    }

    pub fn state(&self) -> GizmoState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != GizmoState::Inactive
    }

    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Activate over a layer. A previously active selection is
    /// committed first, keeping exactly one gizmo live.
    ///
    /// The box comes from the layer's content extent when strokes have
    /// been recorded, else a default-sized box at the sprite position.
    pub fn activate(&mut self, surfaces: &mut CanvasSurfaces, layer: LayerId) -> bool {
        if self.is_active() {
            if self.layer == Some(layer) {
                return true;
            }
            self.deactivate(surfaces);
        }
        let Some(surface) = surfaces.get(layer) else {
            log::debug!("transform activation on unknown layer {layer}, ignored");
            return false;
        };

        let bounds = match surface.data.content_bounds.as_ref() {
            Some(content) => content.to_rect(),
            None => {
                let origin = surface.sprite.position;
                Rect::new(
                    origin.x,
                    origin.y,
                    origin.x + DEFAULT_BOX_SIZE,
                    origin.y + DEFAULT_BOX_SIZE,
                )
            }
        };

        self.layer = Some(layer);
        self.bounds = bounds;
        self.content = bounds;
        self.rotation = surface.sprite.rotation;
        self.state = GizmoState::Active;
        true
    }

    /// Commit the current transform to the layer sprite and go
    /// inactive.
    pub fn deactivate(&mut self, surfaces: &mut CanvasSurfaces) {
        if !self.is_active() {
            return;
        }
        if let Some(layer) = self.layer {
            if let Some(surface) = surfaces.get_mut(layer) {
                let sprite = &mut surface.sprite;
                sprite.pivot = self.content.center();
                sprite.position = self.bounds.center();
                sprite.rotation = self.rotation;
                sprite.scale = Vec2::new(
                    self.bounds.width() / self.content.width().max(1.0),
                    self.bounds.height() / self.content.height().max(1.0),
                );
            }
        }
        self.cancel();
    }

    /// Go inactive without committing.
    pub fn cancel(&mut self) {
        self.state = GizmoState::Inactive;
        self.layer = None;
        self.bounds = Rect::ZERO;
        self.content = Rect::ZERO;
        self.rotation = 0.0;
    }

    /// Handle positions in world space, rotated with the box.
    pub fn handles(&self) -> Vec<(GizmoHandle, Point)> {
        if !self.is_active() {
            return Vec::new();
        }
        let center = self.bounds.center();
        let half_w = self.bounds.width() / 2.0;
        let half_h = self.bounds.height() / 2.0;
        let place = |dx: f64, dy: f64| rotate_about(center, Vec2::new(dx, dy), self.rotation);

        vec![
            (GizmoHandle::Corner(Corner::TopLeft), place(-half_w, -half_h)),
            (GizmoHandle::Corner(Corner::TopRight), place(half_w, -half_h)),
            (
                GizmoHandle::Corner(Corner::BottomLeft),
                place(-half_w, half_h),
            ),
            (
                GizmoHandle::Corner(Corner::BottomRight),
                place(half_w, half_h),
            ),
            (GizmoHandle::Edge(Edge::Top), place(0.0, -half_h)),
            (GizmoHandle::Edge(Edge::Right), place(half_w, 0.0)),
            (GizmoHandle::Edge(Edge::Bottom), place(0.0, half_h)),
            (GizmoHandle::Edge(Edge::Left), place(-half_w, 0.0)),
            (
                GizmoHandle::Rotate,
                place(0.0, -half_h - ROTATE_HANDLE_OFFSET),
            ),
        ]
    }

    /// The handle under the pointer, if any.
    pub fn handle_at(&self, point: Point) -> Option<GizmoHandle> {
        self.handles()
            .into_iter()
            .find(|(_, position)| (point - *position).hypot() <= HANDLE_HIT_TOLERANCE)
            .map(|(handle, _)| handle)
    }

    /// Pointer down: picks a handle, or starts a move when inside the
    /// box, or does nothing.
    pub fn pointer_down(&mut self, point: Point) {
        if self.state != GizmoState::Active {
            return;
        }
        self.last_pointer = point;
        match self.handle_at(point) {
            Some(GizmoHandle::Rotate) => self.state = GizmoState::Rotating,
            Some(handle) => self.state = GizmoState::Resizing(handle),
            None => {
                if self.bounds.contains(point) {
                    self.state = GizmoState::Dragging;
                }
            }
        }
    }

    /// Pointer move while interacting.
    pub fn pointer_move(&mut self, point: Point) {
        let delta = point - self.last_pointer;
        match self.state {
            GizmoState::Dragging => {
                self.bounds = self.bounds + delta;
                self.last_pointer = point;
            }
            GizmoState::Resizing(GizmoHandle::Rotate) | GizmoState::Inactive | GizmoState::Active => {}
            GizmoState::Resizing(handle) => {
                self.bounds = resize_rect(self.bounds, handle, delta.x, delta.y);
                self.last_pointer = point;
            }
            GizmoState::Rotating => {
                self.rotation = self.angle_to(point, false);
                self.last_pointer = point;
            }
        }
    }

    /// Pointer move during rotation with optional 15-degree snapping.
    pub fn rotate_to(&mut self, point: Point, snap: bool) {
        if self.state != GizmoState::Rotating {
            return;
        }
        self.rotation = self.angle_to(point, snap);
        self.last_pointer = point;
    }

    /// Pointer up: back to Active, interaction finished.
    pub fn pointer_up(&mut self) {
        if self.is_active() {
            self.state = GizmoState::Active;
        }
    }

    /// Angle in degrees from the box center to the pointer.
    fn angle_to(&self, point: Point, snap: bool) -> f64 {
        let center = self.bounds.center();
        let mut angle = (point.y - center.y).atan2(point.x - center.x).to_degrees();
        if snap {
            angle = (angle / 15.0).round() * 15.0;
        }
        angle
    }
}

/// Resize by moving only the edges the handle implies. Sizes come out
/// of `Rect::from_points`, so a handle dragged past the opposite edge
/// flips which edge is near instead of going negative.
fn resize_rect(rect: Rect, handle: GizmoHandle, dx: f64, dy: f64) -> Rect {
    let (mut x0, mut y0, mut x1, mut y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
    let (left, right, top, bottom) = match handle {
        GizmoHandle::Corner(Corner::TopLeft) => (true, false, true, false),
        GizmoHandle::Corner(Corner::TopRight) => (false, true, true, false),
        GizmoHandle::Corner(Corner::BottomLeft) => (true, false, false, true),
        GizmoHandle::Corner(Corner::BottomRight) => (false, true, false, true),
        GizmoHandle::Edge(Edge::Top) => (false, false, true, false),
        GizmoHandle::Edge(Edge::Right) => (false, true, false, false),
        GizmoHandle::Edge(Edge::Bottom) => (false, false, false, true),
        GizmoHandle::Edge(Edge::Left) => (true, false, false, false),
        GizmoHandle::Rotate => (false, false, false, false),
    };
    if left {
        x0 += dx;
    }
    if right {
        x1 += dx;
    }
    if top {
        y0 += dy;
    }
    if bottom {
        y1 += dy;
    }
    Rect::from_points(Point::new(x0, y0), Point::new(x1, y1))
}

fn rotate_about(center: Point, offset: Vec2, degrees: f64) -> Point {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    Point::new(
        center.x + offset.x * cos - offset.y * sin,
        center.y + offset.x * sin + offset.y * cos,
    )
}
