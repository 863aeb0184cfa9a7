//! Resize and tail handles for the selected bubble.

use super::{SpeechBubbleSettings, TailStyle, tail};
use kurbo::{Point, Rect};

/// Smallest body size a handle drag can produce.
pub const MIN_RESIZE_SIZE: f64 = 10.0;

/// Pointer pick radius around a handle center.
pub const HANDLE_HIT_RADIUS: f64 = 8.0;

/// The 8 compass positions around the body rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlePosition {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

impl HandlePosition {
    pub const ALL: [HandlePosition; 8] = [
        HandlePosition::NorthWest,
        HandlePosition::North,
        HandlePosition::NorthEast,
        HandlePosition::East,
        HandlePosition::SouthEast,
        HandlePosition::South,
        HandlePosition::SouthWest,
        HandlePosition::West,
    ];

    /// Handle center on the body rectangle.
    pub fn anchor_point(&self, rect: Rect) -> Point {
        let center = rect.center();
        match self {
            HandlePosition::NorthWest => Point::new(rect.x0, rect.y0),
            HandlePosition::North => Point::new(center.x, rect.y0),
            HandlePosition::NorthEast => Point::new(rect.x1, rect.y0),
            HandlePosition::East => Point::new(rect.x1, center.y),
            HandlePosition::SouthEast => Point::new(rect.x1, rect.y1),
            HandlePosition::South => Point::new(center.x, rect.y1),
            HandlePosition::SouthWest => Point::new(rect.x0, rect.y1),
            HandlePosition::West => Point::new(rect.x0, center.y),
        }
    }

    fn moves_left_edge(&self) -> bool {
        matches!(
            self,
            HandlePosition::NorthWest | HandlePosition::West | HandlePosition::SouthWest
        )
    }

    fn moves_right_edge(&self) -> bool {
        matches!(
            self,
            HandlePosition::NorthEast | HandlePosition::East | HandlePosition::SouthEast
        )
    }

    fn moves_top_edge(&self) -> bool {
        matches!(
            self,
            HandlePosition::NorthWest | HandlePosition::North | HandlePosition::NorthEast
        )
    }

    fn moves_bottom_edge(&self) -> bool {
        matches!(
            self,
            HandlePosition::SouthWest | HandlePosition::South | HandlePosition::SouthEast
        )
    }
}

/// A draggable handle on the selected bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BubbleHandle {
    Resize(HandlePosition),
    Tail,
}

/// Handle set for a bubble: the 8 resize handles, plus the tail handle
/// at the tail tip when the tail style renders.
pub fn handle_points(rect: Rect, settings: &SpeechBubbleSettings) -> Vec<(BubbleHandle, Point)> {
    let mut handles: Vec<(BubbleHandle, Point)> = HandlePosition::ALL
        .iter()
        .map(|p| (BubbleHandle::Resize(*p), p.anchor_point(rect)))
        .collect();
    if settings.tail_style != TailStyle::None {
        let geometry = tail::tail_geometry(settings, rect);
        handles.push((BubbleHandle::Tail, geometry.end));
    }
    handles
}

/// The handle under `point`, if any.
pub fn handle_at(
    rect: Rect,
    settings: &SpeechBubbleSettings,
    point: Point,
) -> Option<BubbleHandle> {
    handle_points(rect, settings)
        .into_iter()
        .find(|(_, center)| (point - *center).hypot() <= HANDLE_HIT_RADIUS)
        .map(|(handle, _)| handle)
}

/// Resize `rect` by dragging a handle by `(dx, dy)`.
///
/// Only the edges implied by the handle move; the opposite corner or
/// edge stays fixed. Sizes are clamped so the body never collapses.
pub fn resize_bounds(rect: Rect, handle: HandlePosition, dx: f64, dy: f64) -> Rect {
    let mut x0 = rect.x0;
    let mut y0 = rect.y0;
    let mut x1 = rect.x1;
    let mut y1 = rect.y1;

    if handle.moves_left_edge() {
        x0 = (x0 + dx).min(x1 - MIN_RESIZE_SIZE);
    }
    if handle.moves_right_edge() {
        x1 = (x1 + dx).max(x0 + MIN_RESIZE_SIZE);
    }
    if handle.moves_top_edge() {
        y0 = (y0 + dy).min(y1 - MIN_RESIZE_SIZE);
    }
    if handle.moves_bottom_edge() {
        y1 = (y1 + dy).max(y0 + MIN_RESIZE_SIZE);
    }

    Rect::new(x0, y0, x1, y1)
}

/// Recompute tail angle and length from a pointer position, measured as
/// a polar offset from the body center. The angle becomes an explicit
/// override; the length is the distance past the perimeter, clamped.
pub fn drag_tail(settings: &mut SpeechBubbleSettings, rect: Rect, pointer: Point) {
    let center = rect.center();
    let offset = pointer - center;
    if offset.hypot() < f64::EPSILON {
        return;
    }
    let angle = offset.y.atan2(offset.x).to_degrees();
    let start = tail::perimeter_point(rect, settings.style, angle);
    let body_reach = (start - center).hypot();
    let length = (offset.hypot() - body_reach).clamp(tail::MIN_TAIL_LENGTH, tail::MAX_TAIL_LENGTH);

    settings.tail_angle = Some(angle);
    settings.tail_length = length;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bubble::TailAnchor;

    #[test]
    fn test_se_drag_grows_from_origin() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let resized = resize_bounds(rect, HandlePosition::SouthEast, 20.0, 10.0);
        assert!((resized.x0 - 0.0).abs() < f64::EPSILON);
        assert!((resized.y0 - 0.0).abs() < f64::EPSILON);
        assert!((resized.width() - 120.0).abs() < f64::EPSILON);
        assert!((resized.height() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nw_drag_anchors_opposite_corner() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let resized = resize_bounds(rect, HandlePosition::NorthWest, 20.0, 10.0);
        assert!((resized.x0 - 20.0).abs() < f64::EPSILON);
        assert!((resized.y0 - 10.0).abs() < f64::EPSILON);
        assert!((resized.width() - 80.0).abs() < f64::EPSILON);
        assert!((resized.height() - 40.0).abs() < f64::EPSILON);
        assert!((resized.x1 - 100.0).abs() < f64::EPSILON);
        assert!((resized.y1 - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_edge_handle_moves_one_edge() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let resized = resize_bounds(rect, HandlePosition::North, 20.0, -10.0);
        assert!((resized.y0 + 10.0).abs() < f64::EPSILON);
        assert!((resized.x0 - 0.0).abs() < f64::EPSILON);
        assert!((resized.x1 - 100.0).abs() < f64::EPSILON);
        assert!((resized.y1 - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_never_collapses() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let resized = resize_bounds(rect, HandlePosition::East, -500.0, 0.0);
        assert!((resized.width() - MIN_RESIZE_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tail_handle_present_only_with_tail() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let with_tail = SpeechBubbleSettings::default();
        assert_eq!(handle_points(rect, &with_tail).len(), 9);

        let without = SpeechBubbleSettings {
            tail_style: TailStyle::None,
            ..Default::default()
        };
        assert_eq!(handle_points(rect, &without).len(), 8);
    }

    #[test]
    fn test_drag_tail_sets_override_and_clamped_length() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let mut settings = SpeechBubbleSettings {
            tail_anchor: TailAnchor::TopCenter,
            tail_angle: None,
            ..Default::default()
        };
        // Pointer straight right of the center, well past the body.
        drag_tail(&mut settings, rect, Point::new(130.0, 25.0));
        assert!((settings.tail_angle.unwrap() - 0.0).abs() < 1e-9);
        assert!((settings.tail_length - 30.0).abs() < 1e-9);

        // Inside the body clamps to the minimum length.
        drag_tail(&mut settings, rect, Point::new(60.0, 25.0));
        assert!((settings.tail_length - tail::MIN_TAIL_LENGTH).abs() < 1e-9);
    }
}
